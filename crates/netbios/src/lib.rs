//! NetBIOS over TCP/IP client.
//!
//! - [`NameService`]: name resolution, inverse lookup, node status and LAN discovery.
//! - [`Session`]: NetBIOS sessions (or SMB directly over TCP) and the SMB negotiate probe.
//! - [`Client`]: both of the above, configured through [`ClientConfig`].
//!
//! Every failure is an [`Error`], and every outcome classifies into a [`ResultCode`]:
//! ```
//! use netbios::{Error, ResultCode};
//! let err = Error::NtStatus(0xC0000022);
//! assert_eq!(err.result_code(), ResultCode::NtStatusError);
//! assert_eq!(ResultCode::NtStatusError.as_raw(), -2);
//! ```
#![forbid(unsafe_code)]

#[cfg(not(any(feature = "async", feature = "sync")))]
compile_error!("You must enable exactly one of the following features: async, sync");
#[cfg(all(feature = "async", feature = "sync"))]
compile_error!("You must enable exactly one of the following features: async, sync");

pub mod capabilities;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod name_service;
pub mod session;
pub mod smb;

pub use capabilities::PlatformCapabilities;
pub use client::Client;
pub use config::{ClientConfig, NameServiceConfig, SessionConfig};
pub use discovery::{Discoverer, DiscoveryEvent, NsEntry};
pub use error::{Error, ResultCode};
pub use name_service::NameService;
pub use session::{Session, SessionState};
pub use smb::{SmbFamily, SmbProbe};

pub use netbios_msg::*;
pub use netbios_transport as transport;
pub use netbios_transport::TransportConfig;

/// NetBIOS Result type
pub type Result<T> = std::result::Result<T, crate::Error>;
