//! Video recording
//!
//! - [`CaptureStateMachine`] drives the camera through countdown, recording and review
//! - [`Recorder`] turns a live stream into one buffered [`crate::artifact::Artifact`]
//! - [`PhaseTimer`] ticks the countdown and the recording clock

pub mod coordinator;
pub mod format;
pub mod media_recorder;
pub mod state;
pub mod timer;

pub use coordinator::{CaptureEvent, CaptureStateMachine};
pub use format::{Container, NegotiatedFormat, DEFAULT_MIME_PREFERENCES};
pub use media_recorder::{Recorder, RecordingBuffer};
pub use state::{CapturePhase, RecorderError, RecorderState, TimerState};
pub use timer::{format_elapsed, PhaseTimer, TimerKind};
