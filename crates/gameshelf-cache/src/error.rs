use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Remote cache connection failed: {0}")]
    Connection(String),

    #[error("Remote cache command failed: {0}")]
    Command(String),

    #[error("Remote cache is not ready")]
    NotReady,
}
