//! Page boundary helpers that sit beside the capture controllers
//!
//! Deferred widget initialization, embedded video refresh on language
//! change, and phone input cleanup.

pub mod date_picker;
pub mod input;
pub mod translation;
pub mod watcher;

pub use date_picker::{BootstrapOutcome, DateInput, DatePage, DatePickerBootstrap, PickerOptions};
pub use input::sanitize_phone;
pub use translation::{EmbeddedFrame, FrameHost, LanguageChange, TranslationRefresh};
pub use watcher::ConditionWatcher;
