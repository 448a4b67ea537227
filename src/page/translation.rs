//! Reload embedded videos after a language switch
//!
//! Translated pages keep one video container per language. Embedded players
//! do not pick up the switch on their own, so every frame is pointed at its
//! own source again.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONTAINERS: [&str; 2] = [".video-EN", ".video-FR"];

/// A language switch reported by the translation widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageChange {
    pub language: String,
    pub previous: Option<String>,
}

/// An embedded player frame
pub trait EmbeddedFrame: Send + Sync {
    fn src(&self) -> Option<String>;
    fn set_src(&self, src: &str);
}

/// Frame lookup by container selector
pub trait FrameHost: Send + Sync {
    fn frames(&self, container: &str) -> Vec<Arc<dyn EmbeddedFrame>>;
}

pub struct TranslationRefresh {
    host: Arc<dyn FrameHost>,
    containers: Vec<String>,
}

impl TranslationRefresh {
    pub fn new(host: Arc<dyn FrameHost>) -> Self {
        Self {
            host,
            containers: DEFAULT_CONTAINERS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn with_containers<I, S>(mut self, containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.containers = containers.into_iter().map(Into::into).collect();
        self
    }

    /// Reassign every frame's source; returns how many were reloaded
    pub fn refresh(&self) -> usize {
        let mut reloaded = 0;
        for container in &self.containers {
            for frame in self.host.frames(container) {
                match frame.src() {
                    Some(src) if !src.is_empty() => {
                        frame.set_src(&src);
                        reloaded += 1;
                        tracing::debug!("Video refreshed in {}", container);
                    }
                    _ => {}
                }
            }
        }
        reloaded
    }

    /// Wait for `initialized`, then refresh on every language change
    ///
    /// Changes sent before initialization are not replayed. Returns the
    /// number of changes handled.
    pub async fn run<F>(
        &self,
        initialized: F,
        events: broadcast::Receiver<LanguageChange>,
        cancel: &CancellationToken,
    ) -> usize
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = cancel.cancelled() => return 0,
            _ = initialized => {}
        }
        tracing::info!("Translation widget initialized; watching language changes");

        let mut events = events.resubscribe();
        let mut handled = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = events.recv() => match received {
                    Ok(change) => {
                        tracing::info!("Language changed to {}", change.language);
                        self.refresh();
                        handled += 1;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("Missed {} language change(s)", missed);
                        self.refresh();
                        handled += 1;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        handled
    }
}
