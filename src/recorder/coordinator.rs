//! Video capture coordinator
//!
//! Orchestrates the camera session, the recorder and the phase timer through
//! Idle → DeviceActive → Countdown → Recording → Reviewing.
//!
//! State lives behind a mutex that is never held across an `.await`. Every
//! transition that resets the machine bumps an epoch; async continuations
//! (camera acquisition, recorder finalization, timer callbacks) carry the
//! epoch they started under and drop their result when it no longer matches.
//! Actions that make no sense in the current phase are ignored.

use super::media_recorder::Recorder;
use super::state::{CapturePhase, RecorderState, TimerState};
use super::timer::{format_elapsed, PhaseTimer};
use crate::artifact::{
    Artifact, ArtifactMetadata, ArtifactPublisher, ObjectUrls, PreviewHandle, PreviewSlot,
    PublishedValue,
};
use crate::capture::session::DeviceMediaSession;
use crate::capture::traits::MediaDevices;
use crate::config::CaptureConfig;
use crate::ui::{AffordanceRegistry, Layout, Slot, StatusMessage};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

const STATUS_IDLE: &str = "Click Start Video to begin.";
const STATUS_READY: &str = "Ready to record video.";
const STATUS_CAPTURED: &str = "Video captured. Ready to upload.";

/// Events emitted by the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// Entered a new phase
    PhaseChanged(CapturePhase),
    /// Seconds left before recording starts
    CountdownTick(u32),
    /// Seconds recorded so far
    ElapsedTick(u64),
    /// A recording was finalized and published
    ArtifactReady(ArtifactMetadata),
    /// An error sent the machine back to idle
    Error(String),
}

struct Inner {
    phase: CapturePhase,
    epoch: u64,
    acquiring: bool,
    recorder: Option<Recorder>,
    timer: PhaseTimer,
    timer_state: TimerState,
    artifact: Option<Artifact>,
    preview: PreviewSlot,
}

struct Shared {
    config: CaptureConfig,
    session: DeviceMediaSession,
    ui: AffordanceRegistry,
    publisher: Arc<dyn ArtifactPublisher>,
    events: broadcast::Sender<CaptureEvent>,
    inner: Mutex<Inner>,
}

/// Video capture state machine
///
/// Cheap to clone; clones drive the same machine.
#[derive(Clone)]
pub struct CaptureStateMachine {
    shared: Arc<Shared>,
}

impl CaptureStateMachine {
    pub fn new(
        config: CaptureConfig,
        devices: Arc<dyn MediaDevices>,
        ui: AffordanceRegistry,
        publisher: Arc<dyn ArtifactPublisher>,
        urls: Arc<dyn ObjectUrls>,
    ) -> Self {
        let (events, _) = broadcast::channel(100);
        let session =
            DeviceMediaSession::new(devices, ui.live_feed.clone(), config.live_preview_id.clone());
        let inner = Inner {
            phase: CapturePhase::Idle,
            epoch: 0,
            acquiring: false,
            recorder: None,
            timer: PhaseTimer::new(config.tick_period()),
            timer_state: TimerState::default(),
            artifact: None,
            preview: PreviewSlot::new(urls),
        };

        let shared = Arc::new(Shared {
            config,
            session,
            ui,
            publisher,
            events,
            inner: Mutex::new(inner),
        });
        {
            let mut inner = shared.inner.lock();
            shared.enter(&mut inner, CapturePhase::Idle);
        }
        Self { shared }
    }

    pub fn phase(&self) -> CapturePhase {
        self.shared.inner.lock().phase
    }

    pub fn timer_state(&self) -> TimerState {
        self.shared.inner.lock().timer_state
    }

    /// The artifact under review
    pub fn artifact(&self) -> Option<Artifact> {
        self.shared.inner.lock().artifact.clone()
    }

    pub fn preview_handle(&self) -> Option<PreviewHandle> {
        self.shared.inner.lock().preview.current().cloned()
    }

    pub fn has_open_session(&self) -> bool {
        self.shared.session.is_open()
    }

    /// Whether a camera request is still outstanding
    pub fn is_acquiring(&self) -> bool {
        self.shared.inner.lock().acquiring
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.shared.events.subscribe()
    }

    /// Open the camera; from Reviewing the previous artifact is discarded first
    pub async fn start(&self) {
        let shared = &self.shared;
        let epoch = {
            let mut inner = shared.inner.lock();
            let phase = inner.phase;
            match phase {
                CapturePhase::Idle => {}
                CapturePhase::Reviewing => shared.discard_artifact(&mut inner),
                other => {
                    tracing::debug!("Ignoring start while {:?}", other);
                    return;
                }
            }
            inner.recorder = None;
            inner.epoch += 1;
            inner.acquiring = true;
            shared.enter(&mut inner, CapturePhase::DeviceActive);
            inner.epoch
        };

        let constraints = shared.config.video_constraints();
        let acquired = shared.session.acquire(&constraints).await;

        let mut inner = shared.inner.lock();
        if inner.epoch != epoch || inner.phase != CapturePhase::DeviceActive {
            if let Ok(session) = acquired {
                shared.session.discard(session);
            }
            return;
        }
        inner.acquiring = false;

        match acquired {
            Err(e) => shared.fail(&mut inner, e.user_message()),
            Ok(session) => {
                let stream = session.stream();
                shared.session.activate(session);
                match Recorder::create(
                    shared.session.devices().as_ref(),
                    stream,
                    shared.config.mime_preferences.as_slice(),
                    &shared.config.video_filename_stem,
                ) {
                    Ok(recorder) => inner.recorder = Some(recorder),
                    Err(e) => {
                        tracing::error!("Failed to create recorder: {}", e);
                        shared.fail(&mut inner, e.user_message());
                    }
                }
            }
        }
    }

    /// Start the countdown; recording begins when it reaches zero
    pub fn begin_recording(&self) {
        let shared = &self.shared;
        let mut inner = shared.inner.lock();
        if inner.phase != CapturePhase::DeviceActive || inner.acquiring {
            tracing::debug!("Ignoring begin-recording while {:?}", inner.phase);
            return;
        }
        if inner.recorder.as_ref().map(Recorder::state) != Some(RecorderState::Idle) {
            tracing::warn!("Ignoring begin-recording without an idle recorder");
            return;
        }

        let epoch = inner.epoch;
        shared.enter(&mut inner, CapturePhase::Countdown);

        let on_tick = Arc::downgrade(shared);
        let on_complete = Arc::downgrade(shared);
        inner.timer.start_countdown(
            shared.config.countdown_seconds,
            move |remaining| {
                if let Some(shared) = on_tick.upgrade() {
                    shared.on_countdown_tick(epoch, remaining);
                }
            },
            move || {
                if let Some(shared) = on_complete.upgrade() {
                    shared.on_countdown_complete(epoch);
                }
            },
        );
    }

    /// Finish the recording and move to review
    ///
    /// Returns the new artifact, or `None` if nothing was recording.
    pub async fn stop(&self) -> Option<Artifact> {
        let shared = &self.shared;
        let (mut recorder, epoch) = {
            let mut inner = shared.inner.lock();
            if inner.phase != CapturePhase::Recording {
                tracing::debug!("Ignoring stop while {:?}", inner.phase);
                return None;
            }
            let Some(recorder) = inner.recorder.take() else {
                tracing::debug!("Ignoring stop; recording is already finishing");
                return None;
            };
            inner.timer.stop();
            inner.timer_state.running = false;
            (recorder, inner.epoch)
        };

        let finished = recorder.stop().await;
        drop(recorder);

        let mut inner = shared.inner.lock();
        if inner.epoch != epoch || inner.phase != CapturePhase::Recording {
            tracing::warn!("Dropping recording finished after the machine moved on");
            return None;
        }
        shared.session.release();

        match finished {
            Ok(Some(artifact)) => {
                shared.review(&mut inner, artifact.clone());
                Some(artifact)
            }
            Ok(None) => {
                shared.reset(&mut inner);
                None
            }
            Err(e) => {
                tracing::error!("Failed to finalize recording: {}", e);
                shared.fail(&mut inner, e.user_message());
                None
            }
        }
    }

    /// Abandon the camera before recording starts
    pub fn cancel(&self) {
        let mut inner = self.shared.inner.lock();
        let phase = inner.phase;
        match phase {
            CapturePhase::DeviceActive | CapturePhase::Countdown => {
                tracing::info!("Capture cancelled during {:?}", phase);
                self.shared.reset(&mut inner);
            }
            other => tracing::debug!("Ignoring cancel while {:?}", other),
        }
    }

    /// Throw the reviewed artifact away
    pub fn retake(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.phase != CapturePhase::Reviewing {
            tracing::debug!("Ignoring retake while {:?}", inner.phase);
            return;
        }
        self.shared.reset(&mut inner);
    }

    /// Release everything and clear the published value
    pub fn teardown(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.reset(&mut inner);
        self.shared.publisher.clear(&self.shared.config.keys.video);
    }
}

impl Shared {
    fn emit(&self, event: CaptureEvent) {
        let _ = self.events.send(event);
    }

    fn enter(&self, inner: &mut Inner, phase: CapturePhase) {
        inner.phase = phase;
        self.ui.apply(&layout_for(phase));
        match phase {
            CapturePhase::Idle => self.ui.set_status(StatusMessage::plain(STATUS_IDLE)),
            CapturePhase::DeviceActive => self.ui.set_status(StatusMessage::plain(STATUS_READY)),
            CapturePhase::Reviewing => self.ui.set_status(StatusMessage::plain(STATUS_CAPTURED)),
            CapturePhase::Countdown | CapturePhase::Recording => {}
        }
        tracing::info!("Capture phase -> {:?}", phase);
        self.emit(CaptureEvent::PhaseChanged(phase));
    }

    /// Drop every resource and return to idle
    fn reset(&self, inner: &mut Inner) {
        inner.epoch += 1;
        inner.acquiring = false;
        inner.timer.stop();
        inner.timer_state.running = false;
        inner.recorder = None;
        self.session.release();
        self.discard_artifact(inner);
        self.enter(inner, CapturePhase::Idle);
    }

    fn fail(&self, inner: &mut Inner, message: String) {
        self.reset(inner);
        self.ui.set_status(StatusMessage::plain(message.clone()));
        self.emit(CaptureEvent::Error(message));
    }

    fn discard_artifact(&self, inner: &mut Inner) {
        if inner.preview.revoke() {
            self.ui.set_preview_source(None);
        }
        if let Some(artifact) = inner.artifact.take() {
            tracing::info!("Discarding {}", artifact.filename());
            self.publisher.clear(&self.config.keys.video);
        }
    }

    fn review(&self, inner: &mut Inner, artifact: Artifact) {
        let handle = inner.preview.replace(&artifact);
        self.ui.set_preview_source(Some(&handle));
        self.publisher.publish(
            &self.config.keys.video,
            PublishedValue::Artifact(artifact.clone()),
        );
        let metadata = artifact.metadata();
        inner.artifact = Some(artifact);
        self.enter(inner, CapturePhase::Reviewing);
        self.emit(CaptureEvent::ArtifactReady(metadata));
    }

    fn on_countdown_tick(&self, epoch: u64, remaining: u32) {
        let inner = self.inner.lock();
        if inner.epoch != epoch || inner.phase != CapturePhase::Countdown {
            return;
        }
        self.ui
            .set_status(StatusMessage::emphasized(format!("Starting in {remaining}")));
        self.emit(CaptureEvent::CountdownTick(remaining));
    }

    fn on_countdown_complete(self: &Arc<Self>, epoch: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch || inner.phase != CapturePhase::Countdown {
            tracing::debug!("Stale countdown completion ignored");
            return;
        }

        // Whatever happened during the countdown, only an idle recorder may start
        if inner.recorder.as_ref().map(Recorder::state) != Some(RecorderState::Idle) {
            tracing::warn!("Recorder not idle when the countdown ended; returning to idle");
            self.reset(&mut inner);
            return;
        }
        let started = inner.recorder.as_mut().map(Recorder::start);
        if let Some(Err(e)) = started {
            tracing::error!("Failed to start recorder: {}", e);
            self.fail(&mut inner, e.user_message());
            return;
        }

        inner.timer_state = TimerState::started();
        self.enter(&mut inner, CapturePhase::Recording);

        let on_tick = Arc::downgrade(self);
        inner.timer.start_elapsed(move |seconds| {
            if let Some(shared) = on_tick.upgrade() {
                shared.on_elapsed_tick(epoch, seconds);
            }
        });
    }

    fn on_elapsed_tick(&self, epoch: u64, seconds: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch
            || inner.phase != CapturePhase::Recording
            || !inner.timer_state.running
        {
            return;
        }
        inner.timer_state.elapsed_seconds = seconds;
        self.ui.set_status(StatusMessage::recording(format!(
            "Recording... {}",
            format_elapsed(seconds)
        )));
        self.emit(CaptureEvent::ElapsedTick(seconds));
    }
}

fn layout_for(phase: CapturePhase) -> Layout {
    let layout = Layout::default();
    match phase {
        CapturePhase::Idle => layout
            .show(Slot::Start)
            .hide(Slot::BeginRecording)
            .hide(Slot::StopRecording)
            .hide(Slot::Retake)
            .hide(Slot::Upload)
            .hide(Slot::Cancel)
            .live_feed(false)
            .preview(false),
        CapturePhase::DeviceActive => layout
            .hide(Slot::Start)
            .show(Slot::BeginRecording)
            .hide(Slot::StopRecording)
            .hide(Slot::Retake)
            .hide(Slot::Upload)
            .show(Slot::Cancel)
            .live_feed(true)
            .preview(false),
        CapturePhase::Countdown => layout
            .hide(Slot::Start)
            .hide(Slot::BeginRecording)
            .show(Slot::StopRecording)
            .show(Slot::Cancel)
            .live_feed(true),
        CapturePhase::Recording => layout
            .hide(Slot::BeginRecording)
            .show(Slot::StopRecording)
            .hide(Slot::Cancel)
            .live_feed(true),
        CapturePhase::Reviewing => layout
            .hide(Slot::Start)
            .hide(Slot::BeginRecording)
            .hide(Slot::StopRecording)
            .hide(Slot::Cancel)
            .show(Slot::Retake)
            .show(Slot::Upload)
            .live_feed(false)
            .preview(true),
    }
}
