//! Replay engine for recorded mobile touch sequences.
//!
//! A [`Sequence`] — produced externally from a screen recording, with
//! OCR-derived expected screen text per action — is replayed on a device
//! through two platform capability traits: [`GestureDispatcher`] issues the
//! pointer gestures, [`ScreenReader`] exposes the foreground accessibility
//! tree. The [`ExecutionManager`] steps through the actions on a fixed
//! cadence and, after every tap, compares the live screen text against the
//! recorded OCR text by Levenshtein distance; on a mismatch it backs out and
//! pauses for user intervention.

pub mod engine;
pub mod errors;
pub mod gesture;
pub mod matcher;
pub mod screen;
pub mod store;
pub mod types;

pub use engine::{ExecutionManager, ExecutionStep, ReplayConfig};
pub use errors::ReplayError;
pub use gesture::{ExecutableGesture, GestureDispatcher, GestureOutcome};
pub use matcher::{levenshtein, mismatch_ratio};
pub use screen::{screen_text, ScreenNode, ScreenReader, UiNode};
pub use store::SequenceStore;
pub use types::{
    next_sequence_id, Action, ActionType, Position, Sequence, DEFAULT_GESTURE_DURATION,
    RECORDING_FPS,
};
