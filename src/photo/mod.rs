//! Document photo capture
//!
//! A single-shot sibling of the video controller: open the camera, grab one
//! frame as PNG, or accept a PNG picked from disk. The result is previewed
//! and published both as an artifact and as a base64 data URL.

use crate::artifact::{
    Artifact, ArtifactPublisher, ObjectUrls, PreviewHandle, PreviewSlot, PublishedValue,
};
use crate::capture::session::DeviceMediaSession;
use crate::capture::traits::{Frame, MediaDevices};
use crate::config::CaptureConfig;
use crate::ui::{AffordanceRegistry, Layout, Slot, StatusMessage};
use crate::utils::{AppError, AppResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub const PNG_MIME: &str = "image/png";

const STATUS_IDLE: &str = "Please provide an image.";
const STATUS_POSITION: &str = "Position the document in the frame.";
const STATUS_CAPTURED: &str = "Photo captured. Ready to proceed.";
const STATUS_SELECTED: &str = "Image selected. Ready to proceed.";
const STATUS_CRITICAL: &str = "A critical error occurred. Please refresh and try again.";
const STATUS_NOTHING: &str = "No image available to prepare for upload.";
const STATUS_PROCESSED: &str = "Image data processed.";

/// Photo capture errors
#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("expected image/png, got {mime_type}")]
    InvalidFile { mime_type: String },

    #[error("no live frame available")]
    MissingFrame,

    #[error("frame of {width}x{height} carries {len} bytes")]
    InvalidFrame { width: u32, height: u32, len: usize },

    #[error("PNG encoding failed: {0}")]
    Encoding(#[from] png::EncodingError),
}

impl PhotoError {
    /// Message shown in the status region
    pub fn user_message(&self) -> String {
        match self {
            PhotoError::InvalidFile { .. } => {
                "Invalid file format. Please upload a PNG image.".to_string()
            }
            _ => STATUS_CRITICAL.to_string(),
        }
    }
}

/// Photo controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhotoPhase {
    #[default]
    Idle,
    CameraActive,
    Previewing,
}

/// A file picked by the user
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

struct PhotoInner {
    phase: PhotoPhase,
    epoch: u64,
    artifact: Option<Artifact>,
    preview: PreviewSlot,
}

/// Single-photo capture controller
pub struct PhotoCapture {
    config: CaptureConfig,
    session: DeviceMediaSession,
    ui: AffordanceRegistry,
    publisher: Arc<dyn ArtifactPublisher>,
    inner: Mutex<PhotoInner>,
}

impl PhotoCapture {
    pub fn new(
        config: CaptureConfig,
        devices: Arc<dyn MediaDevices>,
        ui: AffordanceRegistry,
        publisher: Arc<dyn ArtifactPublisher>,
        urls: Arc<dyn ObjectUrls>,
    ) -> Self {
        let session =
            DeviceMediaSession::new(devices, ui.live_feed.clone(), config.live_preview_id.clone());
        let capture = Self {
            config,
            session,
            ui,
            publisher,
            inner: Mutex::new(PhotoInner {
                phase: PhotoPhase::Idle,
                epoch: 0,
                artifact: None,
                preview: PreviewSlot::new(urls),
            }),
        };
        {
            let mut inner = capture.inner.lock();
            capture.enter(&mut inner, PhotoPhase::Idle);
        }
        capture
    }

    pub fn phase(&self) -> PhotoPhase {
        self.inner.lock().phase
    }

    pub fn artifact(&self) -> Option<Artifact> {
        self.inner.lock().artifact.clone()
    }

    pub fn preview_handle(&self) -> Option<PreviewHandle> {
        self.inner.lock().preview.current().cloned()
    }

    pub fn has_open_session(&self) -> bool {
        self.session.is_open()
    }

    /// Clear any previous photo and open the camera
    pub async fn start_camera(&self) {
        let epoch = {
            let mut inner = self.inner.lock();
            if inner.phase == PhotoPhase::CameraActive {
                tracing::debug!("Camera already active");
                return;
            }
            self.clear_photo(&mut inner);
            inner.epoch += 1;
            self.enter(&mut inner, PhotoPhase::CameraActive);
            inner.epoch
        };

        let acquired = self.session.acquire(&self.config.photo_constraints()).await;

        let mut inner = self.inner.lock();
        match acquired {
            Ok(session) if inner.epoch == epoch && inner.phase == PhotoPhase::CameraActive => {
                self.session.activate(session);
            }
            Ok(session) => self.session.discard(session),
            Err(e) => {
                if inner.epoch == epoch {
                    self.enter(&mut inner, PhotoPhase::Idle);
                    self.ui.set_status(StatusMessage::plain(e.user_message()));
                }
            }
        }
    }

    /// Grab the current frame as a PNG photo
    pub fn snap(&self) -> AppResult<()> {
        let mut inner = self.inner.lock();
        if inner.phase != PhotoPhase::CameraActive {
            tracing::debug!("Ignoring snap while {:?}", inner.phase);
            return Ok(());
        }

        let frame = self.session.stream().and_then(|stream| stream.grab_frame());
        self.session.release();

        let encoded = frame
            .ok_or(PhotoError::MissingFrame)
            .and_then(|frame| encode_png(&frame));
        match encoded {
            Ok(png) => {
                let artifact = Artifact::new(png, PNG_MIME, self.config.photo_filename.clone());
                self.show(&mut inner, artifact, STATUS_CAPTURED);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Could not capture photo: {}", e);
                inner.epoch += 1;
                self.enter(&mut inner, PhotoPhase::Idle);
                let err = AppError::from(e);
                self.ui.set_status(StatusMessage::plain(err.user_message()));
                Err(err)
            }
        }
    }

    /// Accept a picked file; only PNG is allowed
    pub fn select_file(&self, file: SelectedFile) -> AppResult<()> {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        self.session.release();
        self.clear_photo(&mut inner);

        if file.mime_type != PNG_MIME {
            let err = AppError::from(PhotoError::InvalidFile {
                mime_type: file.mime_type,
            });
            tracing::warn!("Rejected {}: {}", file.name, err);
            self.enter(&mut inner, PhotoPhase::Idle);
            self.ui.set_status(StatusMessage::plain(err.user_message()));
            return Err(err);
        }

        let artifact = Artifact::new(file.data, file.mime_type, file.name);
        self.show(&mut inner, artifact, STATUS_SELECTED);
        Ok(())
    }

    /// Close the camera without taking a photo
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        if inner.phase != PhotoPhase::CameraActive {
            return;
        }
        inner.epoch += 1;
        self.session.release();
        self.enter(&mut inner, PhotoPhase::Idle);
    }

    /// Discard the photo under preview
    pub fn retake(&self) {
        let mut inner = self.inner.lock();
        if inner.phase != PhotoPhase::Previewing {
            return;
        }
        self.clear_photo(&mut inner);
        self.enter(&mut inner, PhotoPhase::Idle);
    }

    /// Hand the current photo to the upload step
    pub fn prepare_upload(&self) -> bool {
        let inner = self.inner.lock();
        match &inner.artifact {
            Some(artifact) => {
                self.publisher.publish(
                    &self.config.keys.photo,
                    PublishedValue::Artifact(artifact.clone()),
                );
                self.ui.set_status(StatusMessage::plain(STATUS_PROCESSED));
                true
            }
            None => {
                self.publisher.clear(&self.config.keys.photo);
                self.ui.set_status(StatusMessage::plain(STATUS_NOTHING));
                false
            }
        }
    }

    fn enter(&self, inner: &mut PhotoInner, phase: PhotoPhase) {
        inner.phase = phase;
        let layout = Layout::default();
        let layout = match phase {
            PhotoPhase::Idle => layout
                .show(Slot::Start)
                .show(Slot::ChooseFile)
                .hide(Slot::Snap)
                .hide(Slot::Cancel)
                .hide(Slot::Retake)
                .live_feed(false)
                .preview(false),
            PhotoPhase::CameraActive => layout
                .hide(Slot::Start)
                .hide(Slot::ChooseFile)
                .show(Slot::Snap)
                .show(Slot::Cancel)
                .hide(Slot::Retake)
                .live_feed(true)
                .preview(false),
            PhotoPhase::Previewing => layout
                .hide(Slot::Start)
                .hide(Slot::ChooseFile)
                .hide(Slot::Snap)
                .hide(Slot::Cancel)
                .show(Slot::Retake)
                .live_feed(false)
                .preview(true),
        };
        self.ui.apply(&layout);
        match phase {
            PhotoPhase::Idle => self.ui.set_status(StatusMessage::plain(STATUS_IDLE)),
            PhotoPhase::CameraActive => self.ui.set_status(StatusMessage::plain(STATUS_POSITION)),
            PhotoPhase::Previewing => {}
        }
        tracing::info!("Photo phase -> {:?}", phase);
    }

    fn show(&self, inner: &mut PhotoInner, artifact: Artifact, status: &str) {
        let handle = inner.preview.replace(&artifact);
        self.ui.set_preview_source(Some(&handle));
        self.publisher.publish(
            &self.config.keys.photo,
            PublishedValue::Artifact(artifact.clone()),
        );
        self.publisher.publish(
            &self.config.keys.photo_base64,
            PublishedValue::Text(data_url(&artifact)),
        );
        inner.artifact = Some(artifact);
        self.enter(inner, PhotoPhase::Previewing);
        self.ui.set_status(StatusMessage::plain(status));
    }

    fn clear_photo(&self, inner: &mut PhotoInner) {
        inner.artifact = None;
        if inner.preview.revoke() {
            self.ui.set_preview_source(None);
        }
        self.publisher.clear(&self.config.keys.photo);
        self.publisher.clear(&self.config.keys.photo_base64);
    }
}

/// Encode an RGBA frame as an 8-bit PNG
pub fn encode_png(frame: &Frame) -> Result<Vec<u8>, PhotoError> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if expected == 0 || frame.rgba.len() != expected {
        return Err(PhotoError::InvalidFrame {
            width: frame.width,
            height: frame.height,
            len: frame.rgba.len(),
        });
    }

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, frame.width, frame.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&frame.rgba)?;
        writer.finish()?;
    }
    Ok(out)
}

/// `data:{mime};base64,{payload}`
pub fn data_url(artifact: &Artifact) -> String {
    format!(
        "data:{};base64,{}",
        artifact.mime_type(),
        BASE64.encode(artifact.data())
    )
}
