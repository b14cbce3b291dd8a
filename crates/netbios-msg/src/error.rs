use thiserror::Error;

#[derive(Error, Debug)]
pub enum NbtMsgError {
    #[error("Invalid NetBIOS name: {0}")]
    InvalidName(String),
    #[error("Charset conversion failed: {0}")]
    CharsetError(String),
    #[error("Invalid level-1 name encoding: {0}")]
    InvalidEncoding(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Missing error code definition for {0:#x}")]
    MissingErrorCodeDefinition(u32),
    #[error("Binrw Error: {0}")]
    BinRWError(#[from] binrw::Error),
}

impl NbtMsgError {
    /// Whether this error, or the custom error carried inside a binrw error,
    /// is a charset conversion failure.
    pub fn is_charset_error(&self) -> bool {
        match self {
            NbtMsgError::CharsetError(_) => true,
            NbtMsgError::BinRWError(e) => Self::binrw_is_charset_error(e),
            _ => false,
        }
    }

    /// Checks whether a binrw error was raised by a charset check while parsing a name.
    pub fn binrw_is_charset_error(err: &binrw::Error) -> bool {
        err.root_cause()
            .custom_err::<NbtMsgError>()
            .is_some_and(NbtMsgError::is_charset_error)
    }

    /// Wraps this error as a binrw custom error at stream position `pos`.
    pub(crate) fn at(self, pos: u64) -> binrw::Error {
        binrw::Error::Custom {
            pos,
            err: Box::new(self),
        }
    }
}
