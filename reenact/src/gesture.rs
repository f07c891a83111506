//! Resolution scaling and gesture dispatch.
//!
//! Recorded actions carry coordinates in the *recording* device's pixel
//! space. [`Action::to_gesture`] rescales them to the current device and
//! produces an [`ExecutableGesture`], the dispatch-ready form the engine
//! hands to the platform through [`GestureDispatcher`].

use crate::types::{Action, ActionType, Position};
use std::time::Duration;
use tracing::{debug, warn};

/// Stroke length of the micro-path a platform adapter should use to register
/// a discrete tap.
pub const TAP_DURATION: Duration = Duration::from_millis(50);

/// Default press duration for a long tap.
pub const LONG_TAP_DURATION: Duration = Duration::from_millis(1000);

/// How an issued gesture ended.
///
/// Cancellation is treated as completion for sequencing purposes; the replay
/// loop proceeds either way and must never block on a cancelled gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    Completed,
    Cancelled,
}

/// The platform capability surface the engine dispatches through.
///
/// Implementations produce pointer-path gestures on the device (on Android
/// this is the accessibility gesture API) and resolve once the platform
/// reports the gesture finished or was cancelled.
#[async_trait::async_trait]
pub trait GestureDispatcher: Send + Sync {
    /// Timed linear path gesture from `from` to `to`.
    async fn swipe(&self, from: Position, to: Position, duration: Duration) -> GestureOutcome;

    /// Discrete tap at `point`.
    async fn tap(&self, point: Position) -> GestureOutcome;

    /// Stationary press at `point` held for `duration`.
    async fn long_tap(&self, point: Position, duration: Duration) -> GestureOutcome;

    /// Platform "back" navigation, issued when verification decides the
    /// screen has drifted.
    async fn navigate_back(&self);

    /// Current device screen resolution (width x height), the scaling
    /// target for recorded coordinates.
    fn screen_size(&self) -> Position;
}

/// A recorded action scaled to the current device, ready to dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecutableGesture {
    Swipe {
        from: Position,
        to: Position,
        duration: Duration,
    },
    Tap {
        point: Position,
    },
    LongTap {
        point: Position,
        duration: Duration,
    },
}

impl ExecutableGesture {
    /// Issue this gesture on the device and wait for its outcome.
    pub async fn dispatch(self, device: &dyn GestureDispatcher) -> GestureOutcome {
        match self {
            Self::Swipe { from, to, duration } => device.swipe(from, to, duration).await,
            Self::Tap { point } => device.tap(point).await,
            Self::LongTap { point, duration } => device.long_tap(point, duration).await,
        }
    }
}

/// Rescale a recorded position to the current device resolution.
///
/// Without recorded dimensions there is no denominator; the original
/// coordinates pass through unchanged.
pub fn scale_position(
    position: Position,
    recorded: Option<Position>,
    device: Position,
) -> Position {
    match recorded {
        Some(d) => {
            let x_scale = device.x / d.x;
            let y_scale = device.y / d.y;
            let scaled = Position::new(position.x * x_scale, position.y * y_scale);
            debug!(%position, %scaled, x_scale, y_scale, "scaled position");
            scaled
        }
        None => {
            debug!(%position, "no recording dimensions; using original position");
            position
        }
    }
}

impl Action {
    /// The dispatch-ready form of this action, scaled from the recording
    /// resolution to `device`. `swipe_duration` comes from the frame timing
    /// of the surrounding sequence and applies to swipes only.
    ///
    /// Returns `None` for an unrecognized action type or an action without
    /// touch points; the replay loop skips those and advances immediately.
    pub fn to_gesture(
        &self,
        recorded: Option<Position>,
        device: Position,
        swipe_duration: Duration,
    ) -> Option<ExecutableGesture> {
        let act_type = self.act_type?;
        let (Some(&first), Some(&last)) = (self.taps.first(), self.taps.last()) else {
            warn!(action = %self, "action has no touch points; skipping");
            return None;
        };

        Some(match act_type {
            ActionType::Swipe => ExecutableGesture::Swipe {
                from: scale_position(first, recorded, device),
                to: scale_position(last, recorded, device),
                duration: swipe_duration,
            },
            ActionType::Tap => ExecutableGesture::Tap {
                point: scale_position(first, recorded, device),
            },
            ActionType::LongTap => ExecutableGesture::LongTap {
                point: scale_position(first, recorded, device),
                duration: LONG_TAP_DURATION,
            },
        })
    }
}
