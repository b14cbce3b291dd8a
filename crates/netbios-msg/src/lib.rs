//! NetBIOS-over-TCP/IP wire structures.
//!
//! - [`name`]: NetBIOS names, level-1 encoding and OEM charset validation.
//! - [`ns`]: name service packets (RFC 1002 4.2), including node status.
//! - [`session`]: session service packets (RFC 1002 4.3).
//! - [`smb`]: the SMB multi-protocol negotiate probe and NT status codes.
#![forbid(unsafe_code)]

pub mod error;
pub mod name;
pub mod node_status;
pub mod ns;
pub mod session;
pub mod smb;

pub use error::NbtMsgError;
pub use name::*;
pub use node_status::*;
pub use ns::*;
pub use session::*;
pub use smb::*;

pub use netbios_derive::{mbitfield, nbt_message_binrw};

/// UDP port of the NetBIOS name service.
pub const NAME_SERVICE_PORT: u16 = 137;
/// TCP port of the NetBIOS session service.
pub const SESSION_SERVICE_PORT: u16 = 139;
/// TCP port of SMB directly over TCP, without a NetBIOS session.
pub const DIRECT_TCP_PORT: u16 = 445;

pub type Result<T> = std::result::Result<T, NbtMsgError>;
