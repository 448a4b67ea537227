//! Arbitrary user action sequences never leave more than one camera open

use capture_kit::artifact::{ObjectUrlRegistry, PageVariableStore};
use capture_kit::capture::SyntheticDevices;
use capture_kit::ui::MemoryUi;
use capture_kit::{CaptureConfig, CaptureStateMachine};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const SURFACE: &str = "live-video-feed";

#[derive(Debug, Clone)]
enum Action {
    Start,
    BeginRecording,
    Stop,
    Cancel,
    Retake,
    Teardown,
    Wait(u64),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => Just(Action::Start),
        2 => Just(Action::BeginRecording),
        2 => Just(Action::Stop),
        1 => Just(Action::Cancel),
        1 => Just(Action::Retake),
        1 => Just(Action::Teardown),
        3 => (0u64..4_000).prop_map(Action::Wait),
    ]
}

struct Page {
    machine: CaptureStateMachine,
    devices: Arc<SyntheticDevices>,
    ui: Arc<MemoryUi>,
    urls: Arc<ObjectUrlRegistry>,
}

impl Page {
    fn new(latency: Duration) -> Self {
        let devices = Arc::new(SyntheticDevices::new().with_acquire_delay(latency));
        let ui = Arc::new(MemoryUi::default());
        let urls = Arc::new(ObjectUrlRegistry::new());
        let machine = CaptureStateMachine::new(
            CaptureConfig::default(),
            devices.clone(),
            ui.registry(),
            Arc::new(PageVariableStore::new()),
            urls.clone(),
        );
        Self {
            machine,
            devices,
            ui,
            urls,
        }
    }

    fn check(&self, step: usize, action: &Action) {
        let open = self.devices.open_streams();
        assert!(open <= 1, "step {step} {action:?}: {open} streams open");
        assert!(
            self.urls.live_count() <= 1,
            "step {step} {action:?}: {} previews live",
            self.urls.live_count()
        );
        if self.machine.has_open_session() {
            assert_eq!(
                self.ui.surfaces(),
                vec![SURFACE.to_string()],
                "step {step} {action:?}: open session without a surface"
            );
            assert!(
                self.ui.attached_stream(SURFACE).is_some(),
                "step {step} {action:?}: open session not attached"
            );
        }
    }
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

async fn replay(latency: Duration, actions: Vec<Action>) {
    let page = Page::new(latency);
    let mut pending: Vec<JoinHandle<()>> = Vec::new();

    for (step, action) in actions.iter().enumerate() {
        match action {
            Action::Start => {
                let machine = page.machine.clone();
                pending.push(tokio::spawn(async move { machine.start().await }));
            }
            Action::BeginRecording => page.machine.begin_recording(),
            Action::Stop => {
                let machine = page.machine.clone();
                pending.push(tokio::spawn(async move {
                    machine.stop().await;
                }));
            }
            Action::Cancel => page.machine.cancel(),
            Action::Retake => page.machine.retake(),
            Action::Teardown => page.machine.teardown(),
            Action::Wait(ms) => tokio::time::sleep(Duration::from_millis(*ms)).await,
        }
        settle().await;
        page.check(step, action);
    }

    for handle in pending {
        handle.await.unwrap();
    }
    page.check(actions.len(), &Action::Wait(0));

    page.machine.teardown();
    assert_eq!(page.devices.open_streams(), 0);
    assert_eq!(page.urls.live_count(), 0);
    assert!(page.ui.surfaces().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn at_most_one_session_for_any_action_sequence(
        latency_ms in 0u64..800,
        actions in prop::collection::vec(action(), 1..40),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();
        runtime.block_on(replay(Duration::from_millis(latency_ms), actions));
    }
}
