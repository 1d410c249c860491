//! crates/aravalli_core/src/builder.rs
//!
//! The AI site builder: turns a free-text change request into a previewed set
//! of file rewrites, and applies a confirmed set as a single unit.
//!
//! The flow is `Idle -> Selecting -> Reading -> Generating -> PreviewReady`,
//! then either `Applying -> Applied` or `Discarded`. Every failure drops back
//! to `Idle`; there is no retry state.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::{FileChange, PendingWrite};
use crate::ports::{CodeGenerationService, PortError, SourceFileService};

//=========================================================================================
// Stages and Errors
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderStage {
    Idle,
    Selecting,
    Reading,
    Generating,
    PreviewReady,
    Applying,
    Applied,
    Discarded,
}

impl BuilderStage {
    /// Whether the flow may move from `self` to `next`. Falling back to `Idle` is always allowed.
    pub fn can_advance_to(self, next: BuilderStage) -> bool {
        use BuilderStage::*;
        next == Idle
            || matches!(
                (self, next),
                (Idle, Selecting)
                    | (Selecting, Reading)
                    | (Reading, Generating)
                    | (Generating, PreviewReady)
                    | (PreviewReady, Applying)
                    | (PreviewReady, Discarded)
                    | (Applying, Applied)
            )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("Please enter a prompt.")]
    EmptyRequest,

    #[error("AI could not identify any files to edit for this request.")]
    NoFilesSelected,

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: PortError,
    },

    #[error("AI did not suggest any code changes.")]
    NoChanges,

    #[error("No changes to apply.")]
    NothingToApply,

    #[error("Failed to snapshot {path} before writing: {source}")]
    SnapshotFailed {
        path: String,
        #[source]
        source: PortError,
    },

    #[error("Failed to write to {path}: {source} (earlier writes rolled back: {rolled_back})")]
    WriteFailed {
        path: String,
        #[source]
        source: PortError,
        rolled_back: bool,
    },

    #[error("{stage:?} step failed: {source}")]
    Service {
        stage: BuilderStage,
        #[source]
        source: PortError,
    },
}

impl BuilderError {
    /// The stage the flow was in when it failed.
    pub fn failed_stage(&self) -> BuilderStage {
        match self {
            BuilderError::EmptyRequest => BuilderStage::Idle,
            BuilderError::NoFilesSelected => BuilderStage::Selecting,
            BuilderError::ReadFailed { .. } => BuilderStage::Reading,
            BuilderError::NoChanges => BuilderStage::Generating,
            BuilderError::NothingToApply
            | BuilderError::SnapshotFailed { .. }
            | BuilderError::WriteFailed { .. } => BuilderStage::Applying,
            BuilderError::Service { stage, .. } => *stage,
        }
    }
}

/// The changes proposed for one request, not yet on disk.
#[derive(Debug, Clone)]
pub struct BuilderPreview {
    pub request: String,
    pub changes: Vec<FileChange>,
}

struct Progress {
    stage: BuilderStage,
}

impl Progress {
    fn starting_at(stage: BuilderStage) -> Self {
        Self { stage }
    }

    fn advance(&mut self, next: BuilderStage) {
        debug_assert!(self.stage.can_advance_to(next));
        debug!(from = ?self.stage, to = ?next, "Site builder stage");
        self.stage = next;
    }
}

//=========================================================================================
// The Pipeline
//=========================================================================================

#[derive(Clone)]
pub struct SiteBuilder {
    codegen: Arc<dyn CodeGenerationService>,
    files: Arc<dyn SourceFileService>,
}

impl SiteBuilder {
    pub fn new(codegen: Arc<dyn CodeGenerationService>, files: Arc<dyn SourceFileService>) -> Self {
        Self { codegen, files }
    }

    /// Runs selection, reading and generation, and returns the proposed changes.
    ///
    /// Nothing is written. A failed read aborts before generation starts.
    pub async fn preview(&self, request: &str) -> Result<BuilderPreview, BuilderError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(BuilderError::EmptyRequest);
        }
        let mut progress = Progress::starting_at(BuilderStage::Idle);

        // --- 1. Selection ---
        progress.advance(BuilderStage::Selecting);
        let available = self.files.list_files().await.map_err(|source| BuilderError::Service {
            stage: BuilderStage::Selecting,
            source,
        })?;
        let selected = self
            .codegen
            .select_files(request, &available)
            .await
            .map_err(|source| BuilderError::Service {
                stage: BuilderStage::Selecting,
                source,
            })?;

        let mut targets: Vec<String> = Vec::new();
        for path in selected {
            if !available.contains(&path) {
                warn!(path = %path, "Model selected a file outside the listing; ignoring");
                continue;
            }
            if !targets.contains(&path) {
                targets.push(path);
            }
        }
        if targets.is_empty() {
            return Err(BuilderError::NoFilesSelected);
        }
        info!(count = targets.len(), "Site builder selected files");

        // --- 2. Reading ---
        progress.advance(BuilderStage::Reading);
        let mut contents = BTreeMap::new();
        for path in &targets {
            let content = self
                .files
                .read_file(path)
                .await
                .map_err(|source| BuilderError::ReadFailed {
                    path: path.clone(),
                    source,
                })?;
            contents.insert(path.clone(), content);
        }

        // --- 3. Generation ---
        progress.advance(BuilderStage::Generating);
        let generated = self
            .codegen
            .generate_changes(request, &contents)
            .await
            .map_err(|source| BuilderError::Service {
                stage: BuilderStage::Generating,
                source,
            })?;

        let mut changes = Vec::new();
        for (path, updated) in generated {
            match contents.get(&path) {
                Some(original) => changes.push(FileChange {
                    path,
                    original: original.clone(),
                    updated,
                }),
                None => warn!(path = %path, "Model rewrote a file it was not given; ignoring"),
            }
        }
        if changes.is_empty() {
            return Err(BuilderError::NoChanges);
        }

        progress.advance(BuilderStage::PreviewReady);
        info!(count = changes.len(), "Site builder preview ready");
        Ok(BuilderPreview {
            request: request.to_string(),
            changes,
        })
    }

    /// Writes a confirmed set of changes as one unit.
    ///
    /// Prior contents are snapshotted first. If any write fails, files already
    /// written are restored (or removed if they did not exist before).
    pub async fn apply(&self, writes: &[PendingWrite]) -> Result<usize, BuilderError> {
        if writes.is_empty() {
            return Err(BuilderError::NothingToApply);
        }
        let mut progress = Progress::starting_at(BuilderStage::PreviewReady);
        progress.advance(BuilderStage::Applying);

        let mut snapshots: Vec<(String, Option<String>)> = Vec::with_capacity(writes.len());
        for write in writes {
            let previous = match self.files.read_file(&write.path).await {
                Ok(content) => Some(content),
                Err(PortError::NotFound(_)) => None,
                Err(source) => {
                    return Err(BuilderError::SnapshotFailed {
                        path: write.path.clone(),
                        source,
                    })
                }
            };
            snapshots.push((write.path.clone(), previous));
        }

        for (index, write) in writes.iter().enumerate() {
            if let Err(source) = self.files.write_file(&write.path, &write.content).await {
                error!(path = %write.path, error = %source, "Write failed; rolling back");
                let rolled_back = self.restore(&snapshots[..index]).await;
                return Err(BuilderError::WriteFailed {
                    path: write.path.clone(),
                    source,
                    rolled_back,
                });
            }
        }

        progress.advance(BuilderStage::Applied);
        info!(count = writes.len(), "Site builder changes applied");
        Ok(writes.len())
    }

    /// Puts back the given snapshots in reverse order. Returns whether all succeeded.
    async fn restore(&self, snapshots: &[(String, Option<String>)]) -> bool {
        let mut clean = true;
        for (path, previous) in snapshots.iter().rev() {
            let result = match previous {
                Some(content) => self.files.write_file(path, content).await,
                None => self.files.remove_file(path).await,
            };
            if let Err(e) = result {
                error!(path = %path, error = %e, "Rollback failed");
                clean = false;
            }
        }
        clean
    }
}
