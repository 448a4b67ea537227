//! Error types and handling
//!
//! Crate-wide error type and the view of it handed back to the host page.

use crate::capture::traits::DeviceError;
use crate::config::ConfigError;
use crate::photo::PhotoError;
use crate::recorder::state::RecorderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Photo error: {0}")]
    Photo(#[from] PhotoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Message suitable for the status region
    pub fn user_message(&self) -> String {
        match self {
            AppError::Device(e) => e.user_message(),
            AppError::Recorder(e) => e.user_message(),
            AppError::Photo(e) => e.user_message(),
            other => format!("Error: {other}"),
        }
    }
}

/// Error response for the host page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Device(DeviceError::PermissionDenied) => "PERMISSION_DENIED",
            AppError::Device(DeviceError::NotFound) => "DEVICE_NOT_FOUND",
            AppError::Device(DeviceError::Busy) => "DEVICE_BUSY",
            AppError::Device(DeviceError::Other(_)) => "DEVICE_ERROR",
            AppError::Recorder(RecorderError::UnsupportedFormat { .. }) => "UNSUPPORTED_FORMAT",
            AppError::Recorder(_) => "RECORDER_ERROR",
            AppError::Photo(PhotoError::InvalidFile { .. }) => "INVALID_FILE",
            AppError::Photo(_) => "PHOTO_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.user_message(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_errors_map_to_distinct_codes() {
        let denied: ErrorResponse = AppError::from(DeviceError::PermissionDenied).into();
        let busy: ErrorResponse = AppError::from(DeviceError::Busy).into();

        assert_eq!(denied.code, "PERMISSION_DENIED");
        assert_eq!(busy.code, "DEVICE_BUSY");
        assert!(denied.message.contains("access denied"));
    }

    #[test]
    fn test_unsupported_format_response() {
        let err = RecorderError::UnsupportedFormat {
            tried: vec!["video/mp4".to_string()],
        };
        let response: ErrorResponse = AppError::from(err).into();

        assert_eq!(response.code, "UNSUPPORTED_FORMAT");
        assert_eq!(response.message, "Your browser doesn't support video recording.");
    }
}
