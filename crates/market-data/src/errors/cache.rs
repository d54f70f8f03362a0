use thiserror::Error;

/// Failures of the optional cache backends.
///
/// These never reach callers of `get`/`set`: the cache logs them and keeps
/// serving from memory.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("External store error: {0}")]
    External(String),

    #[error("External store timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Invalid cache policy: {0}")]
    InvalidPolicy(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        Self::External(e.to_string())
    }
}
