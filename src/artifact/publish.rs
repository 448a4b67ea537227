//! Page-variable side channel
//!
//! Controllers write finished captures here for a separate upload step to
//! consume. They never read back.

use super::Artifact;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A value written under a publisher key
#[derive(Debug, Clone, PartialEq)]
pub enum PublishedValue {
    Artifact(Artifact),
    Text(String),
}

/// Write-only keyed store seen from the controllers
pub trait ArtifactPublisher: Send + Sync {
    fn publish(&self, key: &str, value: PublishedValue);
    fn clear(&self, key: &str);
}

/// Page-lifetime store of published values
#[derive(Debug, Default)]
pub struct PageVariableStore {
    values: RwLock<HashMap<String, PublishedValue>>,
}

impl PageVariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read side, used by the upload step
    pub fn get(&self, key: &str) -> Option<PublishedValue> {
        self.values.read().get(key).cloned()
    }

    pub fn artifact(&self, key: &str) -> Option<Artifact> {
        match self.get(key) {
            Some(PublishedValue::Artifact(artifact)) => Some(artifact),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(PublishedValue::Text(text)) => Some(text),
            _ => None,
        }
    }
}

impl ArtifactPublisher for PageVariableStore {
    fn publish(&self, key: &str, value: PublishedValue) {
        match &value {
            PublishedValue::Artifact(artifact) => tracing::info!(
                "Published {} ({} bytes) under '{}'",
                artifact.filename(),
                artifact.len(),
                key
            ),
            PublishedValue::Text(text) => {
                tracing::info!("Published {} chars under '{}'", text.len(), key)
            }
        }
        self.values.write().insert(key.to_string(), value);
    }

    fn clear(&self, key: &str) {
        if self.values.write().remove(key).is_some() {
            tracing::debug!("Cleared '{}'", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_clear() {
        let store = PageVariableStore::new();
        let artifact = Artifact::new(vec![9u8; 4], "video/mp4", "review-video.mp4");

        store.publish("video_artifact", PublishedValue::Artifact(artifact.clone()));
        assert_eq!(store.artifact("video_artifact"), Some(artifact));
        assert_eq!(store.text("video_artifact"), None);

        store.clear("video_artifact");
        assert!(store.get("video_artifact").is_none());

        // Clearing an absent key is fine
        store.clear("video_artifact");
    }
}
