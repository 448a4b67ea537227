//! Stream recorder
//!
//! Wraps an encoder around a live stream. Segments are delivered through a
//! channel and collected by a background task into the [`RecordingBuffer`];
//! stopping closes the channel, waits for the collector, and joins the
//! buffered segments into one [`Artifact`].

use super::format::NegotiatedFormat;
use super::state::{RecorderError, RecorderState};
use crate::artifact::Artifact;
use crate::capture::traits::{MediaDevices, MediaEncoder, MediaStream};
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Ordered, append-only segment buffer
#[derive(Debug, Default)]
pub struct RecordingBuffer {
    chunks: Vec<Bytes>,
    total_bytes: usize,
}

impl RecordingBuffer {
    /// Append a segment; empty segments are dropped
    pub fn push(&mut self, chunk: Bytes) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
        true
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Concatenate every segment in arrival order, leaving the buffer empty
    pub fn take(&mut self) -> Bytes {
        let mut joined = BytesMut::with_capacity(self.total_bytes);
        for chunk in self.chunks.drain(..) {
            joined.extend_from_slice(&chunk);
        }
        self.total_bytes = 0;
        joined.freeze()
    }
}

/// One recording over one stream
pub struct Recorder {
    format: NegotiatedFormat,
    filename_stem: String,
    stream: Arc<dyn MediaStream>,
    encoder: Box<dyn MediaEncoder>,
    state: RecorderState,
    buffer: Arc<Mutex<RecordingBuffer>>,
    collector: Option<JoinHandle<()>>,
}

impl Recorder {
    /// Negotiate a format from `candidates` and build an encoder for it
    pub fn create<S: AsRef<str>>(
        devices: &dyn MediaDevices,
        stream: Arc<dyn MediaStream>,
        candidates: &[S],
        filename_stem: &str,
    ) -> Result<Self, RecorderError> {
        let format = NegotiatedFormat::negotiate(candidates, |mime| devices.is_type_supported(mime))?;
        let encoder = devices.create_encoder(Arc::clone(&stream), &format.mime_type)?;

        Ok(Self {
            format,
            filename_stem: filename_stem.to_string(),
            stream,
            encoder,
            state: RecorderState::Idle,
            buffer: Arc::new(Mutex::new(RecordingBuffer::default())),
            collector: None,
        })
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn format(&self) -> &NegotiatedFormat {
        &self.format
    }

    /// Segments buffered so far
    pub fn buffered_chunks(&self) -> usize {
        self.buffer.lock().chunk_count()
    }

    /// Begin buffering; only legal from idle
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.state != RecorderState::Idle {
            return Err(RecorderError::NotIdle(self.state));
        }

        self.buffer.lock().clear();
        let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
        self.encoder.start(tx)?;

        let buffer = Arc::clone(&self.buffer);
        self.collector = Some(tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                let len = chunk.len();
                if buffer.lock().push(chunk) {
                    tracing::debug!("Buffered segment of {} bytes", len);
                }
            }
        }));

        self.state = RecorderState::Recording;
        tracing::info!("Recorder started ({})", self.format.mime_type);
        Ok(())
    }

    /// Finish recording and build the artifact
    ///
    /// Returns `Ok(None)` when the recorder was not recording. The stream's
    /// tracks are stopped either way once a recording ends.
    pub async fn stop(&mut self) -> Result<Option<Artifact>, RecorderError> {
        if self.state != RecorderState::Recording {
            tracing::debug!("Ignoring stop on {:?} recorder", self.state);
            return Ok(None);
        }
        self.state = RecorderState::Finished;

        let flushed = self.encoder.stop().await;
        if let Some(collector) = self.collector.take() {
            if let Err(e) = collector.await {
                tracing::warn!("Segment collector ended abnormally: {}", e);
            }
        }
        self.stream.stop_tracks();
        flushed?;

        let (data, chunks) = {
            let mut buffer = self.buffer.lock();
            let chunks = buffer.chunk_count();
            (buffer.take(), chunks)
        };
        let artifact = Artifact::new(
            data,
            self.format.mime_type.clone(),
            self.format.filename(&self.filename_stem),
        );

        tracing::info!(
            "Recorder stopped: {} segments, {} bytes -> {}",
            chunks,
            artifact.len(),
            artifact.filename()
        );
        Ok(Some(artifact))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic::SyntheticDevices;
    use crate::capture::traits::{FacingMode, MediaConstraints};
    use crate::recorder::format::DEFAULT_MIME_PREFERENCES;
    use std::time::Duration;

    async fn stream(devices: &SyntheticDevices) -> Arc<dyn MediaStream> {
        devices
            .get_user_media(&MediaConstraints {
                facing_mode: FacingMode::Environment,
                audio: true,
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_buffer_drops_empty_segments() {
        let mut buffer = RecordingBuffer::default();
        assert!(buffer.push(Bytes::from_static(b"ab")));
        assert!(!buffer.push(Bytes::new()));
        assert!(buffer.push(Bytes::from_static(b"cd")));

        assert_eq!(buffer.chunk_count(), 2);
        assert_eq!(buffer.total_bytes(), 4);
        assert_eq!(buffer.take(), Bytes::from_static(b"abcd"));
        assert_eq!(buffer.chunk_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_runtime() {
        let devices = SyntheticDevices::new().with_supported(Vec::<String>::new());
        let stream = stream(&devices).await;

        let err = Recorder::create(&devices, stream, &DEFAULT_MIME_PREFERENCES, "review-video")
            .err()
            .unwrap();
        assert!(matches!(err, RecorderError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let devices = SyntheticDevices::new();
        let stream = stream(&devices).await;
        let mut recorder =
            Recorder::create(&devices, stream, &DEFAULT_MIME_PREFERENCES, "review-video").unwrap();

        assert_eq!(recorder.stop().await.unwrap(), None);
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(devices.open_streams(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_produces_artifact() {
        let devices = SyntheticDevices::new().with_supported(["video/mp4", "video/webm"]);
        let stream = stream(&devices).await;
        let mut recorder =
            Recorder::create(&devices, stream, &DEFAULT_MIME_PREFERENCES, "review-video").unwrap();
        assert_eq!(recorder.format().mime_type, "video/mp4");

        recorder.start().unwrap();
        assert_eq!(
            recorder.start().unwrap_err(),
            RecorderError::NotIdle(RecorderState::Recording)
        );

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(recorder.buffered_chunks(), 3);

        let artifact = recorder.stop().await.unwrap().unwrap();
        assert_eq!(artifact.mime_type(), "video/mp4");
        assert_eq!(artifact.filename(), "review-video.mp4");
        // Three periodic segments plus the final flush; the empty one is dropped
        assert_eq!(artifact.len(), 4 * 4096);
        assert_eq!(recorder.state(), RecorderState::Finished);
        assert_eq!(devices.open_streams(), 0);

        // A finished recorder stays finished
        assert_eq!(recorder.stop().await.unwrap(), None);
    }
}
