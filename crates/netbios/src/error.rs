//! Errors and the result-code classification every operation maps to.

use netbios_msg::{NbtMsgError, Rcode, Status};
use netbios_transport::TransportError;
use thiserror::Error;

/// Result codes are stable negative integers (success is zero), so they can cross
/// an FFI or process boundary as-is.
macro_rules! make_result_codes {
    ($($name:ident = $value:literal: $description:literal, )+) => {

/// Classification of an operation's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResultCode {
    $($name = $value,)+
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let message = match self {
            $(ResultCode::$name => $description,)+
        };
        write!(f, "{} ({})", message, *self as i32)
    }
}

impl ResultCode {
    /// Every result code, success first.
    pub const ALL: &[ResultCode] = &[$(ResultCode::$name,)+];

    pastey::paste! {
        $(
            pub const [<I32_ $name:snake:upper>]: i32 = $value;
        )+
    }

    pub fn from_raw(value: i32) -> Option<ResultCode> {
        match value {
            $($value => Some(ResultCode::$name),)+
            _ => None,
        }
    }
}
    };
}

make_result_codes! {
    Success = 0: "Success",
    GenericError = -1: "Generic error",
    NtStatusError = -2: "NT status error",
    NetworkError = -3: "Network error",
    CharsetError = -4: "Charset conversion error",
}

impl ResultCode {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }

    /// Classifies the outcome of an operation.
    pub fn classify<T>(result: &crate::Result<T>) -> ResultCode {
        match result {
            Ok(_) => ResultCode::Success,
            Err(e) => e.result_code(),
        }
    }

    /// Process exit status for this code: zero on success, `1..=4` otherwise.
    pub fn exit_code(self) -> u8 {
        self.as_raw().unsigned_abs() as u8
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Name not found: {0}")]
    NameNotFound(String),
    #[error("Name service returned an error: {0}")]
    NameServiceError(Rcode),
    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),
    #[error("Message processing failed: {0}")]
    MessageError(#[from] NbtMsgError),
    #[error("Binary parsing failed: {0}")]
    ParsingError(#[from] binrw::Error),
    #[error("Transport error: {0}")]
    TransportError(#[from] TransportError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Charset conversion failed: {0}")]
    CharsetError(String),
    #[error("Server returned status {}", Status::try_display_as_status(*.0))]
    NtStatus(u32),
}

impl Error {
    /// The result code this error is reported as.
    pub fn result_code(&self) -> ResultCode {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidState(_)
            | Error::NameNotFound(_)
            | Error::NameServiceError(_)
            | Error::Unsupported(_)
            | Error::UnexpectedMessage(_) => ResultCode::GenericError,
            Error::MessageError(e) if e.is_charset_error() => ResultCode::CharsetError,
            Error::MessageError(_) => ResultCode::GenericError,
            Error::ParsingError(e) if NbtMsgError::binrw_is_charset_error(e) => {
                ResultCode::CharsetError
            }
            Error::ParsingError(_) => ResultCode::GenericError,
            Error::TransportError(e) => match e {
                TransportError::ParseError(e) if NbtMsgError::binrw_is_charset_error(e) => {
                    ResultCode::CharsetError
                }
                TransportError::ParseError(_)
                | TransportError::InvalidMessage(_)
                | TransportError::MessageTooLarge(..)
                | TransportError::AlreadyConnected => ResultCode::GenericError,
                TransportError::IoError(_)
                | TransportError::Timeout(_)
                | TransportError::NotConnected
                | TransportError::SessionRejected(_)
                | TransportError::TooManyRetargets(_) => ResultCode::NetworkError,
            },
            Error::IoError(_) => ResultCode::NetworkError,
            Error::CharsetError(_) => ResultCode::CharsetError,
            Error::NtStatus(_) => ResultCode::NtStatusError,
        }
    }

    /// The NT status carried by [`Error::NtStatus`].
    pub fn nt_status(&self) -> Option<u32> {
        match self {
            Error::NtStatus(status) => Some(*status),
            _ => None,
        }
    }
}

impl From<&Error> for ResultCode {
    fn from(value: &Error) -> Self {
        value.result_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netbios_msg::{NameSuffix, NetBiosName, SessionErrorCode};
    use std::time::Duration;

    #[test]
    fn test_result_code_values() {
        assert_eq!(ResultCode::Success.as_raw(), 0);
        assert_eq!(ResultCode::I32_SUCCESS, 0);
        assert_eq!(ResultCode::I32_NT_STATUS_ERROR, -2);
        for (i, code) in ResultCode::ALL.iter().enumerate() {
            assert_eq!(ResultCode::from_raw(code.as_raw()), Some(*code));
            if !code.is_success() {
                assert!(code.as_raw() < 0);
            }
            for other in &ResultCode::ALL[i + 1..] {
                assert_ne!(code.as_raw(), other.as_raw());
            }
        }
        assert_eq!(ResultCode::from_raw(-5), None);
        assert_eq!(ResultCode::from_raw(1), None);
        assert_eq!(ResultCode::CharsetError.exit_code(), 4);
        assert_eq!(ResultCode::NetworkError.to_string(), "Network error (-3)");
    }

    #[test]
    fn test_classify() {
        let cases: Vec<(Error, ResultCode)> = vec![
            (
                Error::InvalidArgument("x".into()),
                ResultCode::GenericError,
            ),
            (Error::NameNotFound("X".into()), ResultCode::GenericError),
            (
                Error::NameServiceError(Rcode::ServerFailure),
                ResultCode::GenericError,
            ),
            (Error::Unsupported("sockets"), ResultCode::GenericError),
            (
                TransportError::Timeout(Duration::from_secs(1)).into(),
                ResultCode::NetworkError,
            ),
            (
                TransportError::SessionRejected(SessionErrorCode::CalledNameNotPresent).into(),
                ResultCode::NetworkError,
            ),
            (
                std::io::Error::from(std::io::ErrorKind::ConnectionRefused).into(),
                ResultCode::NetworkError,
            ),
            (
                NetBiosName::new("café", NameSuffix::WORKSTATION)
                    .unwrap_err()
                    .into(),
                ResultCode::CharsetError,
            ),
            (
                NetBiosName::new("", NameSuffix::WORKSTATION)
                    .unwrap_err()
                    .into(),
                ResultCode::GenericError,
            ),
            (Error::NtStatus(Status::U32_ACCESS_DENIED), ResultCode::NtStatusError),
        ];
        for (error, expected) in cases {
            assert_eq!(ResultCode::from(&error), expected, "{error}");
        }
        assert_eq!(ResultCode::classify(&Ok::<_, Error>(())), ResultCode::Success);
        assert_eq!(
            ResultCode::classify::<()>(&Err(Error::CharsetError("x".into()))),
            ResultCode::CharsetError
        );
    }

    #[test]
    fn test_nt_status_error_carries_status() {
        let err = Error::NtStatus(Status::U32_LOGON_FAILURE);
        assert_eq!(err.nt_status(), Some(0xc000006d));
        assert_eq!(err.to_string(), "Server returned status Logon Failure (0xc000006d)");
        assert_eq!(Error::InvalidState("x".into()).nt_status(), None);
    }
}
