//! Synthetic camera backend
//!
//! Produces gradient frames and fixed-size segments on a timer. Scriptable
//! failures and acquisition latency make it the backend for the demo binary
//! and for exercising every failure path in tests.

use super::traits::{
    DeviceError, Frame, MediaConstraints, MediaDevices, MediaEncoder, MediaStream, TrackKind,
};
use crate::recorder::state::RecorderError;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Scriptable stand-in for runtime media devices
pub struct SyntheticDevices {
    supported: Vec<String>,
    acquire_delay: Duration,
    segment_period: Duration,
    segment_size: usize,
    frame_size: (u32, u32),
    next_failure: Mutex<Option<DeviceError>>,
    open_streams: Arc<AtomicUsize>,
    acquisitions: AtomicUsize,
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self {
            supported: vec![
                "video/webm; codecs=vp9".to_string(),
                "video/webm".to_string(),
            ],
            acquire_delay: Duration::ZERO,
            segment_period: Duration::from_secs(1),
            segment_size: 4096,
            frame_size: (64, 48),
            next_failure: Mutex::new(None),
            open_streams: Arc::new(AtomicUsize::new(0)),
            acquisitions: AtomicUsize::new(0),
        }
    }

    /// Replace the list of recordable mime types
    pub fn with_supported<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported = mime_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    pub fn with_segment_period(mut self, period: Duration) -> Self {
        self.segment_period = period;
        self
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self
    }

    /// Make the next acquisition fail
    pub fn fail_next(&self, error: DeviceError) {
        *self.next_failure.lock() = Some(error);
    }

    /// Streams acquired and not yet stopped
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    /// Successful acquisitions so far
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, DeviceError> {
        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }
        if let Some(error) = self.next_failure.lock().take() {
            return Err(error);
        }

        let index = self.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.open_streams.fetch_add(1, Ordering::SeqCst);

        let mut kinds = vec![TrackKind::Video];
        if constraints.audio {
            kinds.push(TrackKind::Audio);
        }

        Ok(Arc::new(SyntheticStream {
            id: format!("synthetic-{index}"),
            kinds,
            live: AtomicBool::new(true),
            open_streams: Arc::clone(&self.open_streams),
            frame_size: self.frame_size,
        }))
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|s| s == mime_type)
    }

    fn create_encoder(
        &self,
        stream: Arc<dyn MediaStream>,
        mime_type: &str,
    ) -> Result<Box<dyn MediaEncoder>, RecorderError> {
        if !self.is_type_supported(mime_type) {
            return Err(RecorderError::UnsupportedFormat {
                tried: vec![mime_type.to_string()],
            });
        }
        Ok(Box::new(SyntheticEncoder {
            mime_type: mime_type.to_string(),
            stream,
            period: self.segment_period,
            segment_size: self.segment_size,
            sender: None,
            pump: None,
        }))
    }
}

struct SyntheticStream {
    id: String,
    kinds: Vec<TrackKind>,
    live: AtomicBool,
    open_streams: Arc<AtomicUsize>,
    frame_size: (u32, u32),
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn track_kinds(&self) -> Vec<TrackKind> {
        self.kinds.clone()
    }

    fn stop_tracks(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.open_streams.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!("Stopped tracks of {}", self.id);
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn grab_frame(&self) -> Option<Frame> {
        if !self.is_live() {
            return None;
        }
        let (width, height) = self.frame_size;
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                rgba.extend_from_slice(&[
                    (x * 255 / width.max(1)) as u8,
                    (y * 255 / height.max(1)) as u8,
                    128,
                    255,
                ]);
            }
        }
        Some(Frame {
            width,
            height,
            rgba,
        })
    }
}

struct SyntheticEncoder {
    mime_type: String,
    stream: Arc<dyn MediaStream>,
    period: Duration,
    segment_size: usize,
    sender: Option<mpsc::UnboundedSender<Bytes>>,
    pump: Option<JoinHandle<()>>,
}

impl SyntheticEncoder {
    fn segment(&self, fill: u8) -> Bytes {
        Bytes::from(vec![fill; self.segment_size])
    }
}

#[async_trait]
impl MediaEncoder for SyntheticEncoder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn start(&mut self, chunks: mpsc::UnboundedSender<Bytes>) -> Result<(), RecorderError> {
        if !self.stream.is_live() {
            return Err(RecorderError::Encoder("stream has ended".to_string()));
        }

        let pump_tx = chunks.clone();
        let period = self.period;
        let size = self.segment_size;
        self.pump = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick is immediate; segments are emitted once a period has elapsed
            ticker.tick().await;
            let mut fill: u8 = 1;
            loop {
                ticker.tick().await;
                if pump_tx.send(Bytes::from(vec![fill; size])).is_err() {
                    break;
                }
                fill = fill.wrapping_add(1);
            }
        }));
        self.sender = Some(chunks);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RecorderError> {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            let _ = pump.await;
        }
        if let Some(sender) = self.sender.take() {
            // Final flush, plus an empty delivery the way browsers sometimes do
            let _ = sender.send(self.segment(0xFF));
            let _ = sender.send(Bytes::new());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::traits::FacingMode;

    #[tokio::test]
    async fn test_stream_accounting() {
        let devices = SyntheticDevices::new();
        let constraints = MediaConstraints {
            facing_mode: FacingMode::User,
            audio: false,
        };

        let stream = devices.get_user_media(&constraints).await.unwrap();
        assert_eq!(stream.track_kinds(), vec![TrackKind::Video]);
        assert_eq!(devices.open_streams(), 1);

        stream.stop_tracks();
        stream.stop_tracks();
        assert_eq!(devices.open_streams(), 0);
        assert!(stream.grab_frame().is_none());
    }

    #[tokio::test]
    async fn test_scripted_failure_applies_once() {
        let devices = SyntheticDevices::new();
        devices.fail_next(DeviceError::Busy);
        let constraints = MediaConstraints {
            facing_mode: FacingMode::Environment,
            audio: true,
        };

        assert_eq!(
            devices.get_user_media(&constraints).await.err(),
            Some(DeviceError::Busy)
        );
        assert!(devices.get_user_media(&constraints).await.is_ok());
    }

    #[test]
    fn test_frame_dimensions() {
        let stream = SyntheticStream {
            id: "s".to_string(),
            kinds: vec![TrackKind::Video],
            live: AtomicBool::new(true),
            open_streams: Arc::new(AtomicUsize::new(1)),
            frame_size: (4, 3),
        };
        let frame = stream.grab_frame().unwrap();
        assert_eq!(frame.rgba.len(), 4 * 3 * 4);
    }
}
