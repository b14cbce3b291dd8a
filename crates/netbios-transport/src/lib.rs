#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod netbios;
pub mod tcp;
pub mod udp;

pub use config::*;
pub use error::TransportError;
pub use netbios::NetBiosTransport;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(all(feature = "async", feature = "is_sync"))]
compile_error!(
    "The async and is_sync features are mutually exclusive. \
    Disable default features to build the blocking transports."
);
#[cfg(not(any(feature = "async", feature = "is_sync")))]
compile_error!("You must enable exactly one of the following features: async, is_sync");
