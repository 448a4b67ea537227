//! Recording format negotiation

use super::state::RecorderError;
use serde::{Deserialize, Serialize};

/// Preference order: widely playable MP4 first, WebM as fallback
pub const DEFAULT_MIME_PREFERENCES: [&str; 4] = [
    "video/mp4; codecs=avc1",
    "video/mp4",
    "video/webm; codecs=vp9",
    "video/webm",
];

/// Container part of a recording mime type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Webm,
}

impl Container {
    /// Anything that is not MP4 is written as WebM
    pub fn from_mime(mime_type: &str) -> Self {
        let container = mime_type.split(';').next().unwrap_or_default();
        if container.contains("mp4") {
            Container::Mp4
        } else {
            Container::Webm
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
        }
    }
}

/// First candidate the runtime accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiatedFormat {
    pub mime_type: String,
    pub container: Container,
}

impl NegotiatedFormat {
    pub fn negotiate<S, F>(candidates: &[S], is_supported: F) -> Result<Self, RecorderError>
    where
        S: AsRef<str>,
        F: Fn(&str) -> bool,
    {
        candidates
            .iter()
            .map(AsRef::as_ref)
            .find(|mime| is_supported(mime))
            .map(|mime| {
                tracing::info!("Using mime type: {}", mime);
                NegotiatedFormat {
                    mime_type: mime.to_string(),
                    container: Container::from_mime(mime),
                }
            })
            .ok_or_else(|| {
                tracing::error!("No supported mime types found for recording");
                RecorderError::UnsupportedFormat {
                    tried: candidates.iter().map(|c| c.as_ref().to_string()).collect(),
                }
            })
    }

    /// `{stem}.{extension}`
    pub fn filename(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.container.extension())
    }
}
