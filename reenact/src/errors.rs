use thiserror::Error;

/// Errors surfaced by the replay engine and the sequence store.
///
/// Gesture cancellation, dispatch timeouts, and transient screen-read gaps
/// are deliberately *not* here: the engine contains those and keeps going.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot start execution without a sequence set")]
    SequenceNotLoaded,

    #[error("sequence has no id assigned; cannot persist it")]
    MissingId,

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
