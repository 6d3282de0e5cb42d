//! File-backed checkpoint store
//!
//! The checkpoint is stored as a flat JSON object. Writes go to a temporary file
//! in the same directory which is then renamed over the old checkpoint, so a
//! reader never observes a half-written record.

use crate::checkpoint::Checkpoint;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur reading or writing the checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint file not found: {0}")]
    Missing(PathBuf),

    #[error("Malformed checkpoint {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid checkpoint {path}: page_num must be at least 1")]
    InvalidPage { path: PathBuf },

    #[error("Failed to serialize checkpoint: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Persists the single harvest checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Creates a store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the checkpoint file with default values if it does not exist yet
    ///
    /// An existing checkpoint is never reset, whatever its contents.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A new default checkpoint was written
    /// * `Ok(false)` - A checkpoint already existed and was left untouched
    pub fn initialize(&self) -> Result<bool, CheckpointError> {
        if self.path.exists() {
            tracing::debug!("Checkpoint {} already exists", self.path.display());
            return Ok(false);
        }

        self.save(&Checkpoint::default())?;
        tracing::info!("Created checkpoint {}", self.path.display());
        Ok(true)
    }

    /// Reads the current checkpoint
    ///
    /// # Returns
    ///
    /// * `Ok(Checkpoint)` - The persisted position
    /// * `Err(CheckpointError::Missing)` - The file does not exist
    /// * `Err(CheckpointError::Malformed)` - The file is not a valid checkpoint
    /// * `Err(CheckpointError::InvalidPage)` - The file names page 0
    pub fn load(&self) -> Result<Checkpoint, CheckpointError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CheckpointError::Missing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let checkpoint: Checkpoint =
            serde_json::from_str(&content).map_err(|source| CheckpointError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        // Listing pages are 1-based.
        if checkpoint.page_num == 0 {
            return Err(CheckpointError::InvalidPage {
                path: self.path.clone(),
            });
        }
        Ok(checkpoint)
    }

    /// Atomically overwrites the persisted checkpoint with `checkpoint`
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let json = serde_json::to_string(checkpoint)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| CheckpointError::Io(e.error))?;

        tracing::trace!(
            "Saved checkpoint url_index={} page={} entry={}",
            checkpoint.current_url_index,
            checkpoint.page_num,
            checkpoint.jar_index
        );
        Ok(())
    }

    /// Overwrites the checkpoint with the default position
    pub fn reset(&self) -> Result<(), CheckpointError> {
        self.save(&Checkpoint::default())
    }
}
