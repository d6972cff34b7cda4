use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Remote store answered with a non-success status.
    #[error("blob store returned {status} for {url}: {snippet}")]
    HttpStatus {
        status: u16,
        url: String,
        snippet: String,
    },

    #[error("blob store response could not be decoded: {0}")]
    Decode(String),

    /// The locator does not belong to this store or is malformed.
    #[error("unsupported blob locator: {0}")]
    UnsupportedLocator(String),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("blob store configuration error: {0}")]
    Config(String),
}
