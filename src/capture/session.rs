//! Single owner of the live camera/microphone stream
//!
//! Acquisition is split in two steps so a controller can re-check its own
//! state after the await: [`DeviceMediaSession::acquire`] returns a
//! [`CaptureSession`] the caller then either [`activate`]s or [`discard`]s.
//!
//! [`activate`]: DeviceMediaSession::activate
//! [`discard`]: DeviceMediaSession::discard

use super::traits::{DeviceError, MediaConstraints, MediaDevices, MediaStream};
use crate::ui::LiveFeed;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// A live hardware stream plus the surface it is bound to
pub struct CaptureSession {
    id: Uuid,
    mount: u64,
    stream: Arc<dyn MediaStream>,
}

impl CaptureSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stream(&self) -> Arc<dyn MediaStream> {
        Arc::clone(&self.stream)
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("mount", &self.mount)
            .field("stream", &self.stream.id())
            .finish()
    }
}

/// Owns at most one open [`CaptureSession`]
///
/// Every acquisition mounts the surface under a new mount number. Only the
/// acquisition holding the latest mount may take the surface down again, so
/// a stale request finishing late never removes a newer request's surface.
pub struct DeviceMediaSession {
    devices: Arc<dyn MediaDevices>,
    live_feed: Option<Arc<dyn LiveFeed>>,
    surface_id: String,
    mounts: AtomicU64,
    active: Mutex<Option<CaptureSession>>,
}

impl DeviceMediaSession {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        live_feed: Option<Arc<dyn LiveFeed>>,
        surface_id: impl Into<String>,
    ) -> Self {
        Self {
            devices,
            live_feed,
            surface_id: surface_id.into(),
            mounts: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Release any open session, mount a fresh surface and request a stream
    pub async fn acquire(&self, constraints: &MediaConstraints) -> Result<CaptureSession, DeviceError> {
        self.release();

        let feed = self.live_feed.as_ref().ok_or_else(|| {
            DeviceError::Other("live preview container was not found".to_string())
        })?;
        feed.remove_surface(&self.surface_id);
        feed.create_surface(&self.surface_id);
        let mount = self.mounts.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            "Requesting camera (facing {:?}, audio {})",
            constraints.facing_mode,
            constraints.audio
        );

        match self.devices.get_user_media(constraints).await {
            Ok(stream) => {
                let session = CaptureSession {
                    id: Uuid::new_v4(),
                    mount,
                    stream,
                };
                tracing::debug!("Acquired {:?}", session);
                Ok(session)
            }
            Err(e) => {
                tracing::error!("Error accessing camera: {}", e);
                self.unmount(mount);
                Err(e)
            }
        }
    }

    /// Bind `session` to the live surface and take ownership of it
    pub fn activate(&self, session: CaptureSession) {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            tracing::warn!("Replacing open session {}", previous.id);
            previous.stream.stop_tracks();
        }
        if let Some(feed) = &self.live_feed {
            feed.attach_stream(&self.surface_id, session.stream());
        }
        tracing::info!("Camera session {} active", session.id);
        *active = Some(session);
    }

    /// Stop a session that was acquired but is no longer wanted
    ///
    /// The surface is left alone if a later acquisition has mounted it.
    pub fn discard(&self, session: CaptureSession) {
        tracing::warn!("Discarding stale camera session {}", session.id);
        session.stream.stop_tracks();
        self.unmount(session.mount);
    }

    /// Stop every track and remove the surface
    ///
    /// Returns whether a session was open.
    pub fn release(&self) -> bool {
        let released = self.active.lock().take();
        if let Some(feed) = &self.live_feed {
            feed.remove_surface(&self.surface_id);
        }
        match released {
            Some(session) => {
                session.stream.stop_tracks();
                tracing::info!("Camera session {} released", session.id);
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn stream(&self) -> Option<Arc<dyn MediaStream>> {
        self.active.lock().as_ref().map(|s| s.stream())
    }

    pub fn devices(&self) -> &Arc<dyn MediaDevices> {
        &self.devices
    }

    fn unmount(&self, mount: u64) {
        let active = self.active.lock();
        if active.is_some() || self.mounts.load(Ordering::SeqCst) != mount {
            return;
        }
        if let Some(feed) = &self.live_feed {
            feed.remove_surface(&self.surface_id);
        }
    }
}

impl Drop for DeviceMediaSession {
    fn drop(&mut self) {
        if let Some(session) = self.active.get_mut().take() {
            session.stream.stop_tracks();
        }
    }
}
