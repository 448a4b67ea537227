//! Recording state management
//!
//! Phases of the capture state machine, recorder lifecycle, timer state and
//! recorder errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current phase of the video capture controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapturePhase {
    /// Nothing open, only "start" offered
    #[default]
    Idle,
    /// Camera live (or being acquired), waiting for "begin recording"
    DeviceActive,
    /// Counting down to the first recorded frame
    Countdown,
    /// Currently recording
    Recording,
    /// Finished recording shown for review
    Reviewing,
}

/// Lifecycle of a single recorder handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// Created, never started
    #[default]
    Idle,
    /// Buffering segments
    Recording,
    /// Stopped; a recorder is not reused
    Finished,
}

/// Elapsed-time display state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub elapsed_seconds: u64,
    pub running: bool,
}

impl TimerState {
    /// Fresh state at recording start
    pub fn started() -> Self {
        Self {
            elapsed_seconds: 0,
            running: true,
        }
    }
}

/// Recorder errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("none of the candidate formats is supported: {}", tried.join(", "))]
    UnsupportedFormat { tried: Vec<String> },

    #[error("recorder is {0:?}, expected idle")]
    NotIdle(RecorderState),

    #[error("encoder error: {0}")]
    Encoder(String),
}

impl RecorderError {
    /// Message shown in the status region
    pub fn user_message(&self) -> String {
        match self {
            RecorderError::UnsupportedFormat { .. } => {
                "Your browser doesn't support video recording.".to_string()
            }
            RecorderError::NotIdle(_) => "Recording is already in progress.".to_string(),
            RecorderError::Encoder(reason) => format!("Error: {reason}"),
        }
    }
}
