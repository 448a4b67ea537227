//! Date-of-birth picker bootstrap
//!
//! Waits for the modal that hosts the input to become visible, then looks
//! for the input for a short while and attaches a date picker to it once.

use super::watcher::ConditionWatcher;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Picker settings applied on initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerOptions {
    pub date_format: String,
    pub max_date: NaiveDate,
    pub default_date: NaiveDate,
}

impl PickerOptions {
    /// `Y-m-d`, nothing after today, defaulting to 2000-01-01
    pub fn date_of_birth() -> Self {
        Self {
            date_format: "Y-m-d".to_string(),
            max_date: Local::now().date_naive(),
            default_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

/// The text input a picker attaches to
pub trait DateInput: Send + Sync {
    /// Whether a picker is already attached
    fn is_initialized(&self) -> bool;

    fn set_read_only(&self, read_only: bool);

    fn init_picker(&self, options: &PickerOptions);
}

/// Page lookups used by the bootstrap
pub trait DatePage: Send + Sync {
    /// `None` when the modal element is not on the page
    fn modal_visible(&self) -> Option<bool>;

    fn date_input(&self) -> Option<Arc<dyn DateInput>>;
}

/// How a bootstrap run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Initialized,
    AlreadyInitialized,
    ModalMissing,
    InputMissing,
    Cancelled,
}

pub struct DatePickerBootstrap {
    page: Arc<dyn DatePage>,
    modal_watcher: ConditionWatcher,
    input_watcher: ConditionWatcher,
    max_attempts: u32,
}

impl DatePickerBootstrap {
    pub fn new(page: Arc<dyn DatePage>) -> Self {
        Self {
            page,
            modal_watcher: ConditionWatcher::new(Duration::from_millis(100)),
            input_watcher: ConditionWatcher::new(Duration::from_millis(100)),
            max_attempts: 20,
        }
    }

    pub fn with_modal_poll(mut self, period: Duration) -> Self {
        self.modal_watcher = ConditionWatcher::new(period);
        self
    }

    pub fn with_input_poll(mut self, period: Duration, max_attempts: u32) -> Self {
        self.input_watcher = ConditionWatcher::new(period);
        self.max_attempts = max_attempts;
        self
    }

    pub async fn run(&self, cancel: &CancellationToken) -> BootstrapOutcome {
        if self.page.modal_visible().is_none() {
            tracing::error!("Could not find the date picker modal");
            return BootstrapOutcome::ModalMissing;
        }

        let page = &self.page;
        let shown = self
            .modal_watcher
            .observe(|| page.modal_visible().filter(|visible| *visible), cancel)
            .await;
        if shown.is_none() {
            return BootstrapOutcome::Cancelled;
        }
        tracing::info!("Modal is visible, looking for the date input");

        let Some(input) = self
            .input_watcher
            .poll_until(|| page.date_input(), self.max_attempts)
            .await
        else {
            tracing::error!(
                "Could not find the date input after {} attempts",
                self.max_attempts
            );
            return BootstrapOutcome::InputMissing;
        };

        if input.is_initialized() {
            return BootstrapOutcome::AlreadyInitialized;
        }

        tracing::info!("Initializing date picker");
        input.set_read_only(true);
        input.init_picker(&PickerOptions::date_of_birth());
        BootstrapOutcome::Initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[derive(Default)]
    struct FakeInput {
        read_only: AtomicBool,
        inits: Mutex<Vec<PickerOptions>>,
    }

    impl DateInput for FakeInput {
        fn is_initialized(&self) -> bool {
            !self.inits.lock().is_empty()
        }

        fn set_read_only(&self, read_only: bool) {
            self.read_only.store(read_only, Ordering::SeqCst);
        }

        fn init_picker(&self, options: &PickerOptions) {
            self.inits.lock().push(options.clone());
        }
    }

    struct FakePage {
        modal: Mutex<Option<bool>>,
        input: Mutex<Option<Arc<FakeInput>>>,
        lookups: AtomicUsize,
    }

    impl FakePage {
        fn new(modal: Option<bool>) -> Arc<Self> {
            Arc::new(Self {
                modal: Mutex::new(modal),
                input: Mutex::new(None),
                lookups: AtomicUsize::new(0),
            })
        }

        fn mount_input(&self) -> Arc<FakeInput> {
            let input = Arc::new(FakeInput::default());
            *self.input.lock() = Some(input.clone());
            input
        }
    }

    impl DatePage for FakePage {
        fn modal_visible(&self) -> Option<bool> {
            *self.modal.lock()
        }

        fn date_input(&self) -> Option<Arc<dyn DateInput>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.input
                .lock()
                .clone()
                .map(|input| input as Arc<dyn DateInput>)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initializes_once_modal_opens() {
        let page = FakePage::new(Some(false));
        let input = page.mount_input();
        let bootstrap = DatePickerBootstrap::new(page.clone());
        let token = CancellationToken::new();

        let opener = page.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(350)).await;
            *opener.modal.lock() = Some(true);
        });

        assert_eq!(bootstrap.run(&token).await, BootstrapOutcome::Initialized);
        assert!(input.read_only.load(Ordering::SeqCst));

        let inits = input.inits.lock().clone();
        assert_eq!(inits.len(), 1);
        assert_eq!(inits[0].date_format, "Y-m-d");
        assert_eq!(inits[0].default_date, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert_eq!(inits[0].max_date, Local::now().date_naive());

        // A second run leaves the existing picker alone
        assert_eq!(
            bootstrap.run(&token).await,
            BootstrapOutcome::AlreadyInitialized
        );
        assert_eq!(input.inits.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_appears_late() {
        let page = FakePage::new(Some(true));
        let bootstrap = DatePickerBootstrap::new(page.clone());

        let mounter = page.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(450)).await;
            mounter.mount_input();
        });

        let outcome = bootstrap.run(&CancellationToken::new()).await;
        assert_eq!(outcome, BootstrapOutcome::Initialized);
        assert_eq!(page.lookups.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_without_input() {
        let page = FakePage::new(Some(true));
        let bootstrap = DatePickerBootstrap::new(page.clone());

        let outcome = bootstrap.run(&CancellationToken::new()).await;
        assert_eq!(outcome, BootstrapOutcome::InputMissing);
        assert_eq!(page.lookups.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_modal_and_cancel() {
        let missing = DatePickerBootstrap::new(FakePage::new(None));
        assert_eq!(
            missing.run(&CancellationToken::new()).await,
            BootstrapOutcome::ModalMissing
        );

        let hidden = DatePickerBootstrap::new(FakePage::new(Some(false)));
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(hidden.run(&token).await, BootstrapOutcome::Cancelled);
    }
}
