/// Result type for pg-finder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ordering listings.
///
/// None of these are fatal: callers log them and continue with a smaller
/// but still consistent ordering.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pin resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("malformed pin data: {0}")]
    MalformedData(String),

    #[error("no rendered element found for `{0}`")]
    ElementNotFound(String),

    #[error("listing already pinned: {0}")]
    AlreadyPinned(String),

    #[error("durable storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedData(err.to_string())
    }
}
