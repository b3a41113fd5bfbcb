use thiserror::Error;

/// Result type for zonecut operations
pub type Result<T> = std::result::Result<T, ZoneError>;

/// Errors that can occur while configuring or running a segmentation
#[derive(Error, Debug)]
pub enum ZoneError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Segmentation was cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Configuration parsing failed: {0}")]
    ConfigParse(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ZoneError {
    /// Returns true if the same call may succeed when retried
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TaskFailed(_))
    }

    /// Returns true if this error was caused by the caller's parameters
    pub const fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::ConfigParse(_)
        )
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}
