use thiserror::Error;

/// Failure raised by a persistent key-value store.
///
/// The cache manager never propagates these; they are logged and the
/// operation degrades to a miss or a no-op.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a network fetch as seen by the SWR controller.
///
/// The controller does not distinguish finer HTTP semantics: fetch functions
/// normalize everything into a human-readable `Request` message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("No network connection")]
    Offline,

    #[error("{0}")]
    Request(String),
}

impl FetchError {
    pub fn request(message: impl Into<String>) -> Self {
        FetchError::Request(message.into())
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(err: anyhow::Error) -> Self {
        FetchError::Request(format!("{:#}", err))
    }
}
