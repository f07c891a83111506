//! Console stand-in for the floating replay overlay.
//!
//! Loads a sequence JSON file, persists it to the local store, and drives a
//! replay session from stdin commands while printing every state change the
//! engine publishes. Gestures go to a logging dispatcher; on a device this
//! binary is replaced by the platform overlay, which consumes exactly the
//! same engine interface.

use anyhow::{bail, Context, Result};
use clap::Parser;
use reenact::{
    next_sequence_id, ExecutionManager, ExecutionStep, GestureDispatcher, GestureOutcome,
    Position, ReplayConfig, Sequence, SequenceStore, UiNode,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "reenact-overlay")]
#[command(about = "Drive a reenact replay session from the console")]
struct Args {
    /// Sequence JSON file to load and replay
    sequence: PathBuf,

    /// Directory for the local sequence store
    #[arg(long, default_value = "sequences")]
    store: PathBuf,

    /// Simulated device resolution, WIDTHxHEIGHT
    #[arg(long, default_value = "1080x1920")]
    resolution: String,
}

/// Dispatcher that narrates gestures instead of touching a device.
struct ConsoleDevice {
    size: Position,
}

#[async_trait::async_trait]
impl GestureDispatcher for ConsoleDevice {
    async fn swipe(&self, from: Position, to: Position, duration: Duration) -> GestureOutcome {
        info!(%from, %to, ?duration, "swipe");
        GestureOutcome::Completed
    }

    async fn tap(&self, point: Position) -> GestureOutcome {
        info!(%point, "tap");
        GestureOutcome::Completed
    }

    async fn long_tap(&self, point: Position, duration: Duration) -> GestureOutcome {
        info!(%point, ?duration, "long tap");
        GestureOutcome::Completed
    }

    async fn navigate_back(&self) {
        info!("back");
    }

    fn screen_size(&self) -> Position {
        self.size
    }
}

/// No foreground window in a console session, so verification is skipped.
struct WindowlessScreen;

#[async_trait::async_trait]
impl reenact::ScreenReader for WindowlessScreen {
    async fn active_window(&self) -> Option<UiNode> {
        None
    }
}

fn parse_resolution(raw: &str) -> Result<Position> {
    let (w, h) = raw
        .split_once('x')
        .context("resolution must be WIDTHxHEIGHT")?;
    Ok(Position::new(w.trim().parse()?, h.trim().parse()?))
}

fn prompt_for(step: ExecutionStep, intervention: bool) -> &'static str {
    if intervention {
        return "Intervention required (type `done` when resolved)";
    }
    match step {
        ExecutionStep::Idle => "Idle",
        ExecutionStep::SetUp => "Ready (type `start`)",
        ExecutionStep::OpenApp => "Open the app, then type `open`",
        ExecutionStep::InProgress => "Replaying",
        ExecutionStep::Complete => "Finished",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let resolution = parse_resolution(&args.resolution)?;

    let raw = tokio::fs::read(&args.sequence)
        .await
        .with_context(|| format!("reading {}", args.sequence.display()))?;
    let mut sequence: Sequence = serde_json::from_slice(&raw).context("parsing sequence JSON")?;
    if sequence.id.is_none() {
        sequence.id = Some(next_sequence_id());
    }
    if sequence.actions().is_empty() {
        bail!("sequence has no processed actions to replay");
    }

    let store = SequenceStore::open(&args.store).await?;
    store.save(&sequence).await?;
    info!(
        id = sequence.id,
        actions = sequence.actions().len(),
        "sequence loaded and stored"
    );

    let exec = ExecutionManager::new(
        Arc::new(ConsoleDevice { size: resolution }),
        Arc::new(WindowlessScreen),
        ReplayConfig::default(),
    );
    exec.set_up_sequence(sequence);

    // Mirror the engine's published state the way the overlay panels would.
    let mut steps = exec.subscribe_step();
    let mut interventions = exec.subscribe_intervention();
    {
        let exec = exec.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = steps.changed() => if changed.is_err() { break },
                    changed = interventions.changed() => if changed.is_err() { break },
                }
                let step = *steps.borrow_and_update();
                let intervention = *interventions.borrow_and_update();
                println!(">> {}  [step {}]", prompt_for(step, intervention), exec.cursor());
            }
        });
    }

    println!("commands: start | open | done | stop | status | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "start" => {
                exec.start()?;
                let runner = exec.clone();
                tokio::spawn(async move { runner.run().await });
            }
            "open" => exec.app_opened(),
            "done" => exec.resolve_intervention(),
            "stop" => exec.stop(),
            "status" => println!(
                ">> {}  [step {}]",
                prompt_for(exec.step(), exec.intervention()),
                exec.cursor()
            ),
            "quit" => break,
            "" => {}
            other => println!("unknown command: {other}"),
        }
    }

    exec.stop();
    Ok(())
}
