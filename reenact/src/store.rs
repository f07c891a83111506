//! Local persistence for recorded sequences.
//!
//! Each sequence lives in its own file, `<dir>/<id>.json`, keyed by the
//! sequence id. Writers racing on *different* sequences cannot clobber each
//! other; concurrent writers of the same id are last-writer-wins.

use crate::errors::ReplayError;
use crate::types::Sequence;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Per-entity keyed store of serialized [`Sequence`]s.
#[derive(Debug, Clone)]
pub struct SequenceStore {
    root: PathBuf,
}

impl SequenceStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, ReplayError> {
        let root = dir.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, id: i64) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// All stored sequences, in unspecified order. Files that fail to parse
    /// are skipped with a warning rather than failing the whole load.
    pub async fn load_all(&self) -> Result<Vec<Sequence>, ReplayError> {
        let mut sequences = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_file(&path).await {
                Ok(sequence) => sequences.push(sequence),
                Err(err) => warn!(?path, %err, "skipping unreadable sequence file"),
            }
        }
        debug!(count = sequences.len(), "loaded sequences");
        Ok(sequences)
    }

    /// The sequence with the given id, or `None` when absent.
    pub async fn get(&self, id: i64) -> Result<Option<Sequence>, ReplayError> {
        let path = self.path_for(id);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(self.read_file(&path).await?))
    }

    /// Insert or overwrite the sequence under its id.
    pub async fn save(&self, sequence: &Sequence) -> Result<(), ReplayError> {
        let id = sequence.id.ok_or(ReplayError::MissingId)?;
        let encoded = serde_json::to_vec_pretty(sequence)?;
        tokio::fs::write(self.path_for(id), encoded).await?;
        debug!(id, "sequence saved");
        Ok(())
    }

    /// Remove the sequence with the given id. Returns whether it existed.
    pub async fn remove(&self, id: i64) -> Result<bool, ReplayError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => {
                debug!(id, "sequence removed");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn read_file(&self, path: &Path) -> Result<Sequence, ReplayError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
