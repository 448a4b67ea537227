//! Camera/microphone capture
//!
//! Hardware seams, the single-session owner, and a synthetic backend.

pub mod session;
pub mod synthetic;
pub mod traits;

pub use session::{CaptureSession, DeviceMediaSession};
pub use synthetic::SyntheticDevices;
pub use traits::{
    DeviceError, FacingMode, Frame, MediaConstraints, MediaDevices, MediaEncoder, MediaStream,
    TrackKind,
};
