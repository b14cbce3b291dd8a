use std::time::Duration;

use netbios_msg::SessionErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Not connected")]
    NotConnected,
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Failed to parse message: {0}")]
    ParseError(#[from] binrw::Error),
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
    #[error("Message too large: {0} bytes, at most {1} allowed")]
    MessageTooLarge(usize, u32),
    #[error("Session rejected by remote: {0}")]
    SessionRejected(SessionErrorCode),
    #[error("Too many session retargets (more than {0})")]
    TooManyRetargets(usize),
}
