//! Scripted capture session against the synthetic camera

use anyhow::{bail, Context, Result};
use capture_kit::artifact::{ObjectUrlRegistry, PageVariableStore};
use capture_kit::capture::SyntheticDevices;
use capture_kit::recorder::CaptureEvent;
use capture_kit::ui::MemoryUi;
use capture_kit::{CaptureConfig, CaptureStateMachine, PhotoCapture};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    capture_kit::init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => CaptureConfig::load(&PathBuf::from(&path))
            .with_context(|| format!("loading config from {path}"))?,
        None => CaptureConfig {
            tick_period_ms: 250,
            ..CaptureConfig::default()
        },
    };
    let tick = config.tick_period();
    let base64_key = config.keys.photo_base64.clone();

    let devices = Arc::new(SyntheticDevices::new().with_segment_period(tick));
    let ui = Arc::new(MemoryUi::default());
    let store = Arc::new(PageVariableStore::new());
    let urls = Arc::new(ObjectUrlRegistry::new());

    let machine = CaptureStateMachine::new(
        config.clone(),
        devices.clone(),
        ui.registry(),
        store.clone(),
        urls.clone(),
    );

    let mut events = machine.subscribe();
    let logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                CaptureEvent::CountdownTick(n) => println!("  countdown {n}"),
                CaptureEvent::ElapsedTick(n) => println!("  recording {n}s"),
                other => println!("  {other:?}"),
            }
        }
    });

    machine.start().await;
    machine.begin_recording();
    tokio::time::sleep(tick * (config.countdown_seconds + 1)).await;
    tokio::time::sleep(tick * 4).await;

    let Some(artifact) = machine.stop().await else {
        bail!("recording did not produce an artifact");
    };
    println!("{}", serde_json::to_string_pretty(&artifact.metadata())?);

    let photo = PhotoCapture::new(config, devices.clone(), ui.registry(), store.clone(), urls);
    photo.start_camera().await;
    photo.snap().context("snapping photo")?;
    if let Some(url) = store.text(&base64_key) {
        println!("photo data URL: {} chars", url.len());
    }

    machine.teardown();
    drop(machine);
    logger.abort();

    if devices.open_streams() != 0 {
        bail!("{} camera stream(s) left open", devices.open_streams());
    }
    Ok(())
}
