//! Revocable preview URLs
//!
//! A controller keeps its preview URL in a [`PreviewSlot`], which revokes the
//! previous URL before minting the next one, so a slot never owns two live
//! handles at once.

use super::Artifact;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Ephemeral object URL bound to one artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mints and revokes object URLs
pub trait ObjectUrls: Send + Sync {
    fn create(&self, artifact: &Artifact) -> PreviewHandle;
    fn revoke(&self, handle: &PreviewHandle);
}

/// In-process object URL table
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    live: Mutex<HashSet<PreviewHandle>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.live.lock().contains(handle)
    }
}

impl ObjectUrls for ObjectUrlRegistry {
    fn create(&self, artifact: &Artifact) -> PreviewHandle {
        let handle = PreviewHandle(format!("blob:capture-kit/{}", Uuid::new_v4()));
        tracing::debug!("Created preview {} for {}", handle, artifact.filename());
        self.live.lock().insert(handle.clone());
        handle
    }

    fn revoke(&self, handle: &PreviewHandle) {
        if !self.live.lock().remove(handle) {
            tracing::warn!("Revoking unknown preview {}", handle);
        }
    }
}

/// Holder of at most one live preview handle
pub struct PreviewSlot {
    urls: Arc<dyn ObjectUrls>,
    current: Option<PreviewHandle>,
}

impl PreviewSlot {
    pub fn new(urls: Arc<dyn ObjectUrls>) -> Self {
        Self { urls, current: None }
    }

    pub fn current(&self) -> Option<&PreviewHandle> {
        self.current.as_ref()
    }

    /// Revoke the current handle, then mint one for `artifact`
    pub fn replace(&mut self, artifact: &Artifact) -> PreviewHandle {
        self.revoke();
        let handle = self.urls.create(artifact);
        self.current = Some(handle.clone());
        handle
    }

    /// Returns whether a handle was revoked
    pub fn revoke(&mut self) -> bool {
        match self.current.take() {
            Some(handle) => {
                self.urls.revoke(&handle);
                true
            }
            None => false,
        }
    }
}

impl Drop for PreviewSlot {
    fn drop(&mut self) {
        self.revoke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str) -> Artifact {
        Artifact::new(vec![1u8, 2, 3], "video/webm", name)
    }

    #[test]
    fn test_replace_revokes_previous_handle() {
        let urls = Arc::new(ObjectUrlRegistry::new());
        let mut slot = PreviewSlot::new(urls.clone());

        let first = slot.replace(&artifact("a.webm"));
        assert!(urls.is_live(&first));

        let second = slot.replace(&artifact("b.webm"));
        assert_ne!(first, second);
        assert!(!urls.is_live(&first));
        assert!(urls.is_live(&second));
        assert_eq!(urls.live_count(), 1);
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let urls = Arc::new(ObjectUrlRegistry::new());
        let mut slot = PreviewSlot::new(urls.clone());
        slot.replace(&artifact("a.webm"));

        assert!(slot.revoke());
        assert!(!slot.revoke());
        assert_eq!(urls.live_count(), 0);
    }

    #[test]
    fn test_drop_revokes() {
        let urls = Arc::new(ObjectUrlRegistry::new());
        {
            let mut slot = PreviewSlot::new(urls.clone());
            slot.replace(&artifact("a.webm"));
            assert_eq!(urls.live_count(), 1);
        }
        assert_eq!(urls.live_count(), 0);
    }
}
