//! Capture trait definitions
//!
//! Runtime-agnostic seams for camera/microphone hardware and the encoder
//! that turns a live stream into binary segments.

use crate::recorder::state::RecorderError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Which camera the runtime should prefer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera
    User,
    /// Back camera
    #[default]
    Environment,
}

/// Requested capabilities for a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConstraints {
    /// Preferred camera
    pub facing_mode: FacingMode,

    /// Whether a microphone track is required
    pub audio: bool,
}

/// Kind of hardware track carried by a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// A single decoded RGBA frame grabbed from a live stream
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Failures while acquiring camera/microphone access
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera found")]
    NotFound,

    #[error("camera is busy or unreadable")]
    Busy,

    #[error("{0}")]
    Other(String),
}

impl DeviceError {
    /// Classify a platform error by its name
    pub fn from_platform(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => DeviceError::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" => DeviceError::NotFound,
            "NotReadableError" | "TrackStartError" => DeviceError::Busy,
            _ => DeviceError::Other(message.to_string()),
        }
    }

    /// Message shown in the status region
    pub fn user_message(&self) -> String {
        match self {
            DeviceError::PermissionDenied => {
                "Camera access denied. Please allow permission in your browser.".to_string()
            }
            DeviceError::NotFound => {
                "No camera found. Please ensure a webcam is connected.".to_string()
            }
            DeviceError::Busy => {
                "Your camera is already in use by another application.".to_string()
            }
            DeviceError::Other(reason) => format!("Error: {reason}"),
        }
    }
}

/// A live hardware stream
///
/// Implementations must make `stop_tracks` idempotent.
pub trait MediaStream: Send + Sync {
    /// Stream identifier
    fn id(&self) -> &str;

    /// Tracks carried by this stream
    fn track_kinds(&self) -> Vec<TrackKind>;

    /// Stop every hardware track
    fn stop_tracks(&self);

    /// Whether any track is still running
    fn is_live(&self) -> bool;

    /// Grab the current video frame, if the stream is live
    fn grab_frame(&self) -> Option<Frame>;
}

/// Encoder producing binary segments from a stream
#[async_trait]
pub trait MediaEncoder: Send {
    /// Negotiated mime type
    fn mime_type(&self) -> &str;

    /// Begin emitting segments into `chunks`
    fn start(&mut self, chunks: mpsc::UnboundedSender<Bytes>) -> Result<(), RecorderError>;

    /// Flush pending data and close the segment channel
    async fn stop(&mut self) -> Result<(), RecorderError>;
}

/// Runtime camera/microphone access and capability probing
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a stream matching `constraints`
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, DeviceError>;

    /// Whether the runtime can record into `mime_type`
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Create an encoder for `stream`
    fn create_encoder(
        &self,
        stream: Arc<dyn MediaStream>,
        mime_type: &str,
    ) -> Result<Box<dyn MediaEncoder>, RecorderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_error_names() {
        assert_eq!(
            DeviceError::from_platform("NotAllowedError", "denied"),
            DeviceError::PermissionDenied
        );
        assert_eq!(
            DeviceError::from_platform("PermissionDeniedError", ""),
            DeviceError::PermissionDenied
        );
        assert_eq!(
            DeviceError::from_platform("DevicesNotFoundError", ""),
            DeviceError::NotFound
        );
        assert_eq!(DeviceError::from_platform("TrackStartError", ""), DeviceError::Busy);
        assert_eq!(
            DeviceError::from_platform("OverconstrainedError", "no back camera"),
            DeviceError::Other("no back camera".to_string())
        );
    }

    #[test]
    fn test_other_message_includes_reason() {
        let err = DeviceError::Other("hardware exploded".to_string());
        assert_eq!(err.user_message(), "Error: hardware exploded");
    }
}
