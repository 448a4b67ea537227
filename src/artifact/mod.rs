//! Finished captures and how they leave the controllers
//!
//! An [`Artifact`] is produced once per completed recording or photo. It is
//! shown through a revocable [`PreviewHandle`] and handed to the host page
//! through an [`ArtifactPublisher`].

pub mod preview;
pub mod publish;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use preview::{ObjectUrlRegistry, ObjectUrls, PreviewHandle, PreviewSlot};
pub use publish::{ArtifactPublisher, PageVariableStore, PublishedValue};

/// Immutable binary capture plus its format metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    data: Bytes,
    mime_type: String,
    filename: String,
    created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            filename: filename.into(),
            created_at: Utc::now(),
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Extension of the suggested filename
    pub fn extension(&self) -> Option<&str> {
        self.filename.rsplit_once('.').map(|(_, ext)| ext)
    }

    pub fn metadata(&self) -> ArtifactMetadata {
        ArtifactMetadata {
            mime_type: self.mime_type.clone(),
            filename: self.filename.clone(),
            size_bytes: self.data.len(),
            created_at: self.created_at,
        }
    }
}

/// Serializable description of an artifact, without the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub mime_type: String,
    pub filename: String,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}
