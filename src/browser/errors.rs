//! Browser error types

use thiserror::Error;

/// Browser-related errors
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to open tab: {0}")]
    TabOpenFailed(String),

    #[error("Tab activation failed: {0}")]
    ActivationFailed(String),

    #[error("No tab at index {0}")]
    TabNotFound(usize),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Failed to close browser: {0}")]
    CloseFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
