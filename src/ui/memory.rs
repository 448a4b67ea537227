//! In-memory page used by the demo binary and tests

use super::{
    Affordance, AffordanceRegistry, LiveFeed, PreviewElement, Slot, StatusMessage, StatusRegion,
};
use crate::artifact::PreviewHandle;
use crate::capture::traits::MediaStream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub const LIVE_FEED: &str = "live-feed";
pub const PREVIEW: &str = "preview";

/// Records every visual update instead of drawing it
#[derive(Default)]
pub struct MemoryUi {
    visible: Mutex<HashMap<String, bool>>,
    statuses: Mutex<Vec<StatusMessage>>,
    surfaces: Mutex<Vec<String>>,
    attached: Mutex<HashMap<String, String>>,
    preview_source: Mutex<Option<PreviewHandle>>,
}

struct MemoryAffordance {
    name: &'static str,
    ui: Arc<MemoryUi>,
}

impl Affordance for MemoryAffordance {
    fn set_visible(&self, visible: bool) {
        self.ui.mark(self.name, visible);
    }
}

impl MemoryUi {
    /// Registry with every element present
    pub fn registry(self: &Arc<Self>) -> AffordanceRegistry {
        let button = |slot: Slot| -> Option<Arc<dyn Affordance>> {
            Some(Arc::new(MemoryAffordance {
                name: slot.as_str(),
                ui: Arc::clone(self),
            }))
        };

        AffordanceRegistry {
            start: button(Slot::Start),
            begin_recording: button(Slot::BeginRecording),
            stop_recording: button(Slot::StopRecording),
            retake: button(Slot::Retake),
            upload: button(Slot::Upload),
            cancel: button(Slot::Cancel),
            snap: button(Slot::Snap),
            choose_file: button(Slot::ChooseFile),
            status: Some(Arc::clone(self) as Arc<dyn StatusRegion>),
            live_feed: Some(Arc::clone(self) as Arc<dyn LiveFeed>),
            preview: Some(Arc::clone(self) as Arc<dyn PreviewElement>),
        }
    }

    fn mark(&self, name: &str, visible: bool) {
        self.visible.lock().insert(name.to_string(), visible);
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.visible.lock().get(name).copied().unwrap_or(false)
    }

    pub fn last_status(&self) -> Option<StatusMessage> {
        self.statuses.lock().last().cloned()
    }

    pub fn status_history(&self) -> Vec<StatusMessage> {
        self.statuses.lock().clone()
    }

    /// Surfaces currently mounted in the live feed container
    pub fn surfaces(&self) -> Vec<String> {
        self.surfaces.lock().clone()
    }

    /// Stream id bound to a surface
    pub fn attached_stream(&self, surface_id: &str) -> Option<String> {
        self.attached.lock().get(surface_id).cloned()
    }

    pub fn preview_source(&self) -> Option<PreviewHandle> {
        self.preview_source.lock().clone()
    }
}

impl StatusRegion for MemoryUi {
    fn show(&self, message: &StatusMessage) {
        self.statuses.lock().push(message.clone());
    }
}

impl LiveFeed for MemoryUi {
    fn set_visible(&self, visible: bool) {
        self.mark(LIVE_FEED, visible);
    }

    fn create_surface(&self, surface_id: &str) {
        let mut surfaces = self.surfaces.lock();
        surfaces.clear();
        self.attached.lock().clear();
        surfaces.push(surface_id.to_string());
    }

    fn attach_stream(&self, surface_id: &str, stream: Arc<dyn MediaStream>) {
        if self.surfaces.lock().iter().any(|s| s == surface_id) {
            self.attached
                .lock()
                .insert(surface_id.to_string(), stream.id().to_string());
        }
    }

    fn remove_surface(&self, surface_id: &str) {
        self.surfaces.lock().retain(|s| s != surface_id);
        self.attached.lock().remove(surface_id);
    }
}

impl PreviewElement for MemoryUi {
    fn set_visible(&self, visible: bool) {
        self.mark(PREVIEW, visible);
    }

    fn set_source(&self, handle: Option<&PreviewHandle>) {
        *self.preview_source.lock() = handle.cloned();
    }
}
