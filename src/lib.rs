//! capture-kit - camera capture controllers for onboarding pages.
//!
//! The main piece is [`recorder::CaptureStateMachine`], which walks a camera
//! session through countdown, recording and review. [`photo::PhotoCapture`]
//! handles single document photos, and [`page`] carries the smaller helpers
//! that live beside them on the same pages.

pub mod artifact;
pub mod capture;
pub mod config;
pub mod page;
pub mod photo;
pub mod recorder;
pub mod ui;
pub mod utils;

pub use config::CaptureConfig;
pub use photo::PhotoCapture;
pub use recorder::{CaptureEvent, CaptureStateMachine};
pub use utils::{AppError, AppResult, ErrorResponse};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the default `capture_kit=debug` filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capture_kit=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("capture-kit v{}", env!("CARGO_PKG_VERSION"));
}
