//! The replay state machine.
//!
//! [`ExecutionManager`] owns the sequence being played, the step cursor, and
//! the intervention flag. A single driver loop ([`ExecutionManager::run`])
//! ticks at a fixed cadence and performs at most one action per tick:
//! verification first (when the previous action was a tap), then one gesture
//! dispatch with a bounded wait, then cursor advance. Gestures are never
//! pipelined.

use crate::errors::ReplayError;
use crate::gesture::{GestureDispatcher, GestureOutcome};
use crate::matcher::mismatch_ratio;
use crate::screen::{screen_text, ScreenReader};
use crate::types::{gesture_duration, Action, ActionType, Position, Sequence};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// Lifecycle of a replay session.
///
/// The `intervention` flag is orthogonal: while it is set the machine stays
/// in `InProgress` but automatic stepping is suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutionStep {
    /// No session. Terminal resting state; `stop()` always returns here.
    Idle,
    /// A sequence has been loaded and reset.
    SetUp,
    /// Waiting for the user to foreground the target application.
    OpenApp,
    /// The driver loop is replaying actions.
    InProgress,
    /// The final action finished naturally.
    Complete,
}

/// Tuning knobs for the replay driver.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Cadence of the driver loop.
    pub tick_interval: Duration,

    /// Verification cutoff: mismatch ratios strictly above this pause the
    /// session for intervention.
    pub mismatch_threshold: f32,

    /// Bounded wait on a single gesture's completion. A gesture that
    /// outlives this is treated like a cancellation and the loop proceeds.
    pub gesture_timeout: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            mismatch_threshold: 0.5,
            gesture_timeout: Duration::from_secs(5),
        }
    }
}

struct ExecState {
    sequence: Option<Sequence>,
    cursor: usize,
    in_progress: bool,
    /// Re-entrancy guard: a gesture has been issued and has not completed.
    in_flight: bool,
}

struct ManagerInner {
    state: Mutex<ExecState>,
    step_tx: watch::Sender<ExecutionStep>,
    intervention_tx: watch::Sender<bool>,
    sequence_tx: watch::Sender<Option<Sequence>>,
    device: Arc<dyn GestureDispatcher>,
    screen: Arc<dyn ScreenReader>,
    config: ReplayConfig,
}

/// Orchestrates replay of one sequence at a time.
///
/// Cheap to clone; clones share the same session. State changes are
/// published over `watch` channels: new subscribers observe the latest
/// value only, and dropping a receiver unsubscribes.
#[derive(Clone)]
pub struct ExecutionManager {
    inner: Arc<ManagerInner>,
}

impl ExecutionManager {
    pub fn new(
        device: Arc<dyn GestureDispatcher>,
        screen: Arc<dyn ScreenReader>,
        config: ReplayConfig,
    ) -> Self {
        let (step_tx, _) = watch::channel(ExecutionStep::Idle);
        let (intervention_tx, _) = watch::channel(false);
        let (sequence_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(ManagerInner {
                state: Mutex::new(ExecState {
                    sequence: None,
                    cursor: 0,
                    in_progress: false,
                    in_flight: false,
                }),
                step_tx,
                intervention_tx,
                sequence_tx,
                device,
                screen,
                config,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ExecState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn step(&self) -> ExecutionStep {
        *self.inner.step_tx.borrow()
    }

    pub fn intervention(&self) -> bool {
        *self.inner.intervention_tx.borrow()
    }

    pub fn cursor(&self) -> usize {
        self.state().cursor
    }

    pub fn is_running(&self) -> bool {
        self.state().in_progress
    }

    pub fn current_sequence(&self) -> Option<Sequence> {
        self.state().sequence.clone()
    }

    pub fn subscribe_step(&self) -> watch::Receiver<ExecutionStep> {
        self.inner.step_tx.subscribe()
    }

    pub fn subscribe_intervention(&self) -> watch::Receiver<bool> {
        self.inner.intervention_tx.subscribe()
    }

    pub fn subscribe_sequence(&self) -> watch::Receiver<Option<Sequence>> {
        self.inner.sequence_tx.subscribe()
    }

    /// Load a sequence for replay. Valid from any state: resets the cursor,
    /// clears any pending intervention, and moves to [`ExecutionStep::SetUp`].
    #[instrument(skip(self, sequence), fields(id = ?sequence.id, actions = sequence.actions().len()))]
    pub fn set_up_sequence(&self, sequence: Sequence) {
        {
            let mut st = self.state();
            st.sequence = Some(sequence.clone());
            st.cursor = 0;
            st.in_flight = false;
        }
        self.inner.intervention_tx.send_replace(false);
        self.inner.sequence_tx.send_replace(Some(sequence));
        self.inner.step_tx.send_replace(ExecutionStep::SetUp);
        info!("sequence set up");
    }

    /// Begin execution. Moves to [`ExecutionStep::OpenApp`]; the session
    /// then waits for [`app_opened`](Self::app_opened).
    ///
    /// Errors with [`ReplayError::SequenceNotLoaded`] and leaves the state
    /// untouched when no sequence has been set up.
    #[instrument(skip(self))]
    pub fn start(&self) -> Result<(), ReplayError> {
        {
            let mut st = self.state();
            if st.sequence.is_none() {
                return Err(ReplayError::SequenceNotLoaded);
            }
            st.in_progress = true;
        }
        self.inner.step_tx.send_replace(ExecutionStep::OpenApp);
        info!("execution started");
        Ok(())
    }

    /// User signal that the target application is in the foreground.
    /// Moves `OpenApp` to `InProgress`; ignored in any other state.
    pub fn app_opened(&self) {
        let moved = self
            .inner
            .step_tx
            .send_if_modified(|step| match *step {
                ExecutionStep::OpenApp => {
                    *step = ExecutionStep::InProgress;
                    true
                }
                _ => false,
            });
        if !moved {
            debug!(step = ?self.step(), "app_opened ignored outside OpenApp");
        }
    }

    /// Raise or clear the intervention flag. Stepping is suspended while it
    /// is set; clearing it resumes from the un-advanced cursor.
    pub fn set_intervention(&self, intervention: bool) {
        self.inner.intervention_tx.send_replace(intervention);
    }

    /// User signal that the unexpected screen state has been dealt with.
    pub fn resolve_intervention(&self) {
        self.set_intervention(false);
    }

    /// Terminate the session. Safe and idempotent from any state; does not
    /// abort a gesture already issued to the platform, but no further
    /// gesture will be dispatched.
    #[instrument(skip(self))]
    pub fn stop(&self) {
        self.state().in_progress = false;
        self.inner.intervention_tx.send_replace(false);
        self.inner.step_tx.send_replace(ExecutionStep::Idle);
        info!("execution stopped");
    }

    /// Drive the session until it leaves the running state. Ticks at
    /// [`ReplayConfig::tick_interval`]; call after [`start`](Self::start).
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.inner.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !self.is_running() {
                break;
            }
            self.tick().await;
        }
        debug!("driver loop exited");
    }

    /// One driver iteration: verify the screen if the previous action was a
    /// tap, dispatch the current action's gesture, advance the cursor.
    ///
    /// No-op unless the session is `InProgress`, not intervening, and no
    /// gesture is in flight.
    pub async fn tick(&self) {
        let Some(work) = self.begin_step() else {
            return;
        };

        if work.verify {
            let matches = self.screen_matches(&work.action).await;
            if !matches {
                self.inner.device.navigate_back().await;
                self.set_intervention(true);
                self.state().in_flight = false;
                return;
            }
        }

        let device_size = self.inner.device.screen_size();
        match work.action.to_gesture(work.recorded_dimensions, device_size, work.swipe_duration) {
            Some(gesture) => {
                let dispatch = gesture.dispatch(&*self.inner.device);
                match tokio::time::timeout(self.inner.config.gesture_timeout, dispatch).await {
                    Ok(GestureOutcome::Completed) => debug!(cursor = work.cursor, "gesture completed"),
                    Ok(GestureOutcome::Cancelled) => {
                        debug!(cursor = work.cursor, "gesture cancelled; proceeding")
                    }
                    Err(_) => warn!(
                        cursor = work.cursor,
                        timeout = ?self.inner.config.gesture_timeout,
                        "gesture did not complete in time; proceeding"
                    ),
                }
            }
            // No executable gesture for this action; advance immediately.
            None => debug!(cursor = work.cursor, "no gesture to run"),
        }

        self.advance();
    }

    /// Claim the current action under the lock, or `None` when this tick
    /// has nothing to do. On success the in-flight guard is set and must be
    /// cleared by `advance` or the intervention path.
    fn begin_step(&self) -> Option<StepWork> {
        if self.step() != ExecutionStep::InProgress || self.intervention() {
            return None;
        }
        let mut st = self.state();
        if st.in_flight {
            return None;
        }
        let sequence = st.sequence.as_ref()?;
        let actions = sequence.actions();
        if st.cursor >= actions.len() {
            // Only reachable with an empty sequence; a natural finish is
            // detected right after the final advance.
            drop(st);
            self.finish();
            return None;
        }
        let cursor = st.cursor;
        let action = actions[cursor].clone();
        let verify = cursor > 0 && actions[cursor - 1].act_type == Some(ActionType::Tap);
        let swipe_duration = gesture_duration(actions, cursor);
        let recorded_dimensions = sequence.dimensions;
        st.in_flight = true;
        Some(StepWork {
            cursor,
            action,
            verify,
            swipe_duration,
            recorded_dimensions,
        })
    }

    /// Compare the live screen text against the upcoming action's expected
    /// OCR text. A missing foreground window skips the check entirely.
    async fn screen_matches(&self, action: &Action) -> bool {
        let Some(root) = self.inner.screen.active_window().await else {
            debug!("no active window; skipping verification");
            return true;
        };
        let live = screen_text(&&root);
        let ratio = mismatch_ratio(&live, &action.resulting_screen_ocr);
        debug!(
            match_percent = (1.0 - ratio) * 100.0,
            "screen verification"
        );
        if ratio > self.inner.config.mismatch_threshold {
            warn!(ratio, "screen does not match expected state; intervention required");
            return false;
        }
        true
    }

    /// Clear the in-flight guard and move the cursor, finishing the session
    /// when the final action is done. Skipped if the session was stopped
    /// while the gesture was in flight.
    fn advance(&self) {
        let mut st = self.state();
        st.in_flight = false;
        if *self.inner.step_tx.borrow() != ExecutionStep::InProgress {
            return;
        }
        st.cursor += 1;
        let total = st.sequence.as_ref().map(|s| s.actions().len()).unwrap_or(0);
        if st.cursor >= total {
            drop(st);
            self.finish();
        }
    }

    /// Natural end of the sequence: land in [`ExecutionStep::Complete`].
    /// `stop()` remains the path back to `Idle`.
    fn finish(&self) {
        self.state().in_progress = false;
        self.inner.step_tx.send_replace(ExecutionStep::Complete);
        info!("sequence finished");
    }
}

struct StepWork {
    cursor: usize,
    action: Action,
    verify: bool,
    swipe_duration: Duration,
    recorded_dimensions: Option<Position>,
}
