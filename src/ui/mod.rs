//! Page affordances
//!
//! Controllers never look elements up themselves; the host page hands them an
//! [`AffordanceRegistry`] where each element is either present or absent.
//! An absent element silently suppresses the matching visual update.

pub mod memory;

use crate::artifact::PreviewHandle;
use crate::capture::traits::MediaStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use memory::MemoryUi;

/// A button-like element that can be shown or hidden
pub trait Affordance: Send + Sync {
    fn set_visible(&self, visible: bool);
}

/// One rendering of the status region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub text: String,

    /// Enlarged text, used by the countdown
    pub emphasized: bool,

    /// Blinking "recording" dot in front of the text
    pub recording_indicator: bool,
}

impl StatusMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: false,
            recording_indicator: false,
        }
    }

    pub fn emphasized(text: impl Into<String>) -> Self {
        Self {
            emphasized: true,
            ..Self::plain(text)
        }
    }

    pub fn recording(text: impl Into<String>) -> Self {
        Self {
            recording_indicator: true,
            ..Self::plain(text)
        }
    }
}

/// Region showing progress and error text
pub trait StatusRegion: Send + Sync {
    fn show(&self, message: &StatusMessage);
}

/// Container that hosts the live camera surface
pub trait LiveFeed: Send + Sync {
    fn set_visible(&self, visible: bool);

    /// Create an empty surface; the container is cleared first
    fn create_surface(&self, surface_id: &str);

    /// Bind a live stream to an existing surface (muted, autoplay, inline)
    fn attach_stream(&self, surface_id: &str, stream: Arc<dyn MediaStream>);

    /// Remove the surface if present
    fn remove_surface(&self, surface_id: &str);
}

/// Element showing a finished artifact
pub trait PreviewElement: Send + Sync {
    fn set_visible(&self, visible: bool);

    /// Point the element at a preview URL, or clear it
    fn set_source(&self, handle: Option<&PreviewHandle>);
}

/// Named button slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Start,
    BeginRecording,
    StopRecording,
    Retake,
    Upload,
    Cancel,
    Snap,
    ChooseFile,
}

impl Slot {
    pub const ALL: [Slot; 8] = [
        Slot::Start,
        Slot::BeginRecording,
        Slot::StopRecording,
        Slot::Retake,
        Slot::Upload,
        Slot::Cancel,
        Slot::Snap,
        Slot::ChooseFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Start => "start",
            Slot::BeginRecording => "begin-recording",
            Slot::StopRecording => "stop-recording",
            Slot::Retake => "retake",
            Slot::Upload => "upload",
            Slot::Cancel => "cancel",
            Slot::Snap => "snap",
            Slot::ChooseFile => "choose-file",
        }
    }
}

/// Every element a controller may touch
#[derive(Clone, Default)]
pub struct AffordanceRegistry {
    pub start: Option<Arc<dyn Affordance>>,
    pub begin_recording: Option<Arc<dyn Affordance>>,
    pub stop_recording: Option<Arc<dyn Affordance>>,
    pub retake: Option<Arc<dyn Affordance>>,
    pub upload: Option<Arc<dyn Affordance>>,
    pub cancel: Option<Arc<dyn Affordance>>,
    pub snap: Option<Arc<dyn Affordance>>,
    pub choose_file: Option<Arc<dyn Affordance>>,
    pub status: Option<Arc<dyn StatusRegion>>,
    pub live_feed: Option<Arc<dyn LiveFeed>>,
    pub preview: Option<Arc<dyn PreviewElement>>,
}

impl AffordanceRegistry {
    pub fn affordance(&self, slot: Slot) -> Option<&Arc<dyn Affordance>> {
        match slot {
            Slot::Start => self.start.as_ref(),
            Slot::BeginRecording => self.begin_recording.as_ref(),
            Slot::StopRecording => self.stop_recording.as_ref(),
            Slot::Retake => self.retake.as_ref(),
            Slot::Upload => self.upload.as_ref(),
            Slot::Cancel => self.cancel.as_ref(),
            Slot::Snap => self.snap.as_ref(),
            Slot::ChooseFile => self.choose_file.as_ref(),
        }
    }

    pub fn set_visible(&self, slot: Slot, visible: bool) {
        if let Some(affordance) = self.affordance(slot) {
            affordance.set_visible(visible);
        }
    }

    /// Apply a full visibility layout
    pub fn apply(&self, layout: &Layout) {
        for (slot, visible) in &layout.slots {
            self.set_visible(*slot, *visible);
        }
        if let (Some(feed), Some(visible)) = (&self.live_feed, layout.live_feed) {
            feed.set_visible(visible);
        }
        if let (Some(preview), Some(visible)) = (&self.preview, layout.preview) {
            preview.set_visible(visible);
        }
    }

    pub fn set_status(&self, message: StatusMessage) {
        if let Some(status) = &self.status {
            status.show(&message);
        }
    }

    pub fn set_preview_source(&self, handle: Option<&PreviewHandle>) {
        if let Some(preview) = &self.preview {
            preview.set_source(handle);
        }
    }
}

/// Visibility for one controller state; `None` leaves an element untouched
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub slots: Vec<(Slot, bool)>,
    pub live_feed: Option<bool>,
    pub preview: Option<bool>,
}

impl Layout {
    pub fn show(mut self, slot: Slot) -> Self {
        self.slots.push((slot, true));
        self
    }

    pub fn hide(mut self, slot: Slot) -> Self {
        self.slots.push((slot, false));
        self
    }

    pub fn live_feed(mut self, visible: bool) -> Self {
        self.live_feed = Some(visible);
        self
    }

    pub fn preview(mut self, visible: bool) -> Self {
        self.preview = Some(visible);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_affordances_are_skipped() {
        let registry = AffordanceRegistry::default();
        let layout = Layout::default()
            .show(Slot::Start)
            .hide(Slot::Retake)
            .live_feed(false)
            .preview(true);

        // Nothing present: must not panic
        registry.apply(&layout);
        registry.set_status(StatusMessage::plain("hello"));
        registry.set_preview_source(None);
    }

    #[test]
    fn test_layout_applies_to_present_slots() {
        let ui = Arc::new(MemoryUi::default());
        let mut registry = ui.registry();
        registry.retake = None;

        registry.apply(&Layout::default().show(Slot::Start).show(Slot::Retake).live_feed(true));

        assert!(ui.is_visible(Slot::Start.as_str()));
        assert!(!ui.is_visible(Slot::Retake.as_str()));
        assert!(ui.is_visible(memory::LIVE_FEED));
    }
}
