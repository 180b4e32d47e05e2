use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("No images provided")]
    NoImages,

    #[error("Image {index} failed: {reason}")]
    ItemFailed { index: usize, reason: String },

    #[error("Download rejected: {0}")]
    Host(String),

    #[error("Invalid inline image data: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<crate::host::HostError> for AppError {
    fn from(err: crate::host::HostError) -> Self {
        AppError::Host(err.to_string())
    }
}
