//! Non-destructive removal and restoration.
//!
//! Removed nodes are renamed into `data/recycling/` and described in the
//! recycle log. Nothing is ever deleted. A recycled node can be restored
//! into any container the move rules allow.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use nonempty::NonEmpty;
use tracing::instrument;
use uuid::Uuid;

use super::{
    journal::{JournalError, Operation, Step},
    layout::{RECYCLING_DIR, generated_name, recycle_bin_name},
    ordering::{append_entry, shift_trailing_siblings_down},
    project::{Loaded, Project},
    recycle::{RecycleLogError, RecycleRecord, append_records, read_log, write_log},
    scan::ScanError,
    sidecar::{Entry, Sidecar, SidecarError, write_index},
};
use crate::domain::{NodeId, NodeKey, PlacementError, ResourceType, placement};

/// A node scheduled for removal, captured before anything changes.
#[derive(Debug)]
struct Victim {
    key: NodeKey,
    resource_type: ResourceType,
    title: String,
    /// For containers: the key and title of each child.
    children: Vec<(NodeKey, String)>,
    child_type: ResourceType,
}

/// What goes wrong with one target of a removal batch.
#[derive(Debug, thiserror::Error)]
pub enum RemoveStepError {
    /// A sidecar could not be updated.
    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    /// The journal could not be written, so the target was skipped.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// The rename into the recycle bin failed.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// The recycle log could not be updated.
    #[error(transparent)]
    Log(#[from] RecycleLogError),
}

/// The targets of a batch that could not be recycled.
#[derive(Debug, thiserror::Error)]
pub struct RemoveFailures {
    failures: NonEmpty<(PathBuf, RemoveStepError)>,
    recycled: usize,
}

impl RemoveFailures {
    /// Each failing path with its error.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &RemoveStepError)> {
        self.failures
            .iter()
            .map(|(path, error)| (path.as_path(), error))
    }

    /// How many nodes were recycled despite the failures.
    #[must_use]
    pub const fn recycled(&self) -> usize {
        self.recycled
    }
}

impl fmt::Display for RemoveFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_DISPLAY: usize = 5;

        write!(f, "failed to remove: ")?;

        let total = self.failures.len();

        let displayed_paths: Vec<String> = self
            .failures
            .iter()
            .take(MAX_DISPLAY)
            .map(|(p, _e)| p.display().to_string())
            .collect();

        let msg = displayed_paths.join(", ");

        if total <= MAX_DISPLAY {
            write!(f, "{msg}")
        } else {
            write!(f, "{msg}... (and {} more)", total - MAX_DISPLAY)
        }
    }
}

/// Errors removing nodes.
#[derive(Debug, thiserror::Error)]
pub enum RemoveError {
    /// A target is not part of the current outline. Nothing was changed.
    #[error("node {0} is not part of the current outline")]
    UnknownNode(NodeId),

    /// The root was selected. Nothing was changed.
    #[error("the root cannot be removed")]
    Root,

    /// The recycle bin could not be created. Nothing was changed.
    #[error("failed to create recycle bin {path}: {source}")]
    RecycleBin {
        /// The recycle bin path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Some targets failed. The rest were recycled and logged.
    #[error(transparent)]
    Incomplete(#[from] RemoveFailures),

    /// The outline could not be rebuilt afterwards.
    #[error("removed, but the outline could not be rebuilt: {0}")]
    Rebuild(#[from] ScanError),
}

/// Errors restoring a recycled node.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    /// The recycle log has no such entry.
    #[error("'{0}' is not in the recycle log")]
    NotInLog(String),

    /// The log names an entry that is not in the recycle bin.
    #[error("{path} is missing from the recycle bin")]
    MissingFromBin {
        /// The expected path.
        path: PathBuf,
    },

    /// The record's type cannot be restored.
    #[error("a recycled {0} cannot be restored")]
    Unrestorable(ResourceType),

    /// The target cannot receive the node.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// The recycle log could not be read or written.
    #[error(transparent)]
    Log(#[from] RecycleLogError),

    /// The destination sidecar could not be updated.
    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    /// A file or directory could not be created or moved.
    #[error("failed to restore into {path}: {source}")]
    Io {
        /// The path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The journal could not be written, so the restore was not started.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// The outline could not be rebuilt afterwards.
    #[error("restored, but the outline could not be rebuilt: {0}")]
    Rebuild(#[from] ScanError),
}

impl Project<Loaded> {
    /// Everything currently in the recycle log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn recycled(&self) -> Result<Vec<RecycleRecord>, RecycleLogError> {
        read_log(&self.layout.recycle_log())
    }

    /// Moves the selected nodes into the recycle bin.
    ///
    /// The selection is first reduced to its local roots. Fragments, chapters
    /// and snips are moved whole. A container stays in place: its sidecar is
    /// reset and each of its children is moved. Every moved node gets one
    /// record, and all records are appended to the log in one write.
    ///
    /// # Errors
    ///
    /// Selecting the root or an unknown node rejects the whole batch before
    /// any change. Otherwise every target is attempted, the log is written
    /// for those that succeeded, and the failures are returned together.
    #[instrument(skip(self, targets), fields(targets = targets.len()))]
    pub fn remove(&mut self, targets: &[NodeId]) -> Result<Vec<RecycleRecord>, RemoveError> {
        for &target in targets {
            let node = self.node(target).ok_or(RemoveError::UnknownNode(target))?;
            if node.resource_type() == ResourceType::Root {
                return Err(RemoveError::Root);
            }
        }

        let bin = self.layout.recycling();
        fs::create_dir_all(&bin).map_err(|source| RemoveError::RecycleBin {
            path: bin.clone(),
            source,
        })?;

        let victims: Vec<Victim> = self
            .local_roots(targets)
            .into_iter()
            .filter_map(|id| self.victim(id))
            .collect();

        let result = self.recycle_all(&victims);
        self.settle(result)
    }

    fn victim(&self, id: NodeId) -> Option<Victim> {
        let outline = self.outline();
        let node = outline.get(id)?;
        let child_type = if id == outline.chapters() {
            ResourceType::Chapter
        } else {
            ResourceType::Snip
        };
        let children = match node.resource_type() {
            ResourceType::Container => outline
                .children(id)
                .into_iter()
                .map(|child| (child.key(), child.ids.display.clone()))
                .collect(),
            _ => Vec::new(),
        };
        Some(Victim {
            key: node.key(),
            resource_type: node.resource_type(),
            title: node.ids.display.clone(),
            children,
            child_type,
        })
    }

    fn recycle_all(&self, victims: &[Victim]) -> Result<Vec<RecycleRecord>, RemoveError> {
        let mut records = Vec::new();
        let mut journal_ids = Vec::new();
        let mut failures = Vec::new();

        for victim in victims {
            let outcome = if victim.resource_type == ResourceType::Container {
                self.clear_container(victim, &mut records, &mut failures)
            } else {
                self.recycle_node(victim, &mut records)
            };
            match outcome {
                Ok(journal_id) => journal_ids.push(journal_id),
                Err((path, error)) => {
                    tracing::warn!("Failed to remove {}: {error}", path.display());
                    failures.push((path, error));
                }
            }
        }

        let log = self.layout.recycle_log();
        match append_records(&log, &records) {
            Ok(()) => {
                for id in journal_ids {
                    self.journal.record(id, Step::LogAppended);
                    self.journal.finish(id);
                }
            }
            Err(e) => failures.push((log, e.into())),
        }

        tracing::info!("Recycled {} nodes", records.len());
        match NonEmpty::from_vec(failures) {
            None => Ok(records),
            Some(failures) => Err(RemoveFailures {
                failures,
                recycled: records.len(),
            }
            .into()),
        }
    }

    /// Moves one fragment, chapter or snip into the bin.
    fn recycle_node(
        &self,
        victim: &Victim,
        records: &mut Vec<RecycleRecord>,
    ) -> Result<Uuid, (PathBuf, RemoveStepError)> {
        let path = self.layout.absolute(&victim.key.path());
        let failed = |error: RemoveStepError| (path.clone(), error);

        let journal_id = self
            .journal
            .begin(Operation::Remove, &victim.key.path(), None)
            .map_err(|e| failed(e.into()))?;

        let parent = self.layout.absolute(&victim.key.relative_path);
        let removed = shift_trailing_siblings_down(&parent, &victim.key.file_name)
            .map_err(|e| failed(e.into()))?;
        self.journal.record(journal_id, Step::SourceShifted);

        let title = removed.map_or_else(|| victim.title.clone(), |entry| entry.title);
        records.push(
            self.move_to_bin(&path, victim.resource_type, Some(title))
                .map_err(|e| failed(e.into()))?,
        );
        self.journal.record(journal_id, Step::StorageMoved);
        Ok(journal_id)
    }

    /// Resets a container's sidecar and moves each child into the bin.
    ///
    /// Every child is attempted. Children that stay behind are indexed again
    /// with their titles, and their failures are added to `failures`.
    fn clear_container(
        &self,
        victim: &Victim,
        records: &mut Vec<RecycleRecord>,
        failures: &mut Vec<(PathBuf, RemoveStepError)>,
    ) -> Result<Uuid, (PathBuf, RemoveStepError)> {
        let dir = self.layout.absolute(&victim.key.path());
        let failed = |error: RemoveStepError| (dir.clone(), error);

        let journal_id = self
            .journal
            .begin(Operation::Remove, &victim.key.path(), None)
            .map_err(|e| failed(e.into()))?;

        if dir.is_dir() {
            write_index(&dir, &Sidecar::default()).map_err(|e| failed(e.into()))?;
        }
        self.journal.record(journal_id, Step::SourceShifted);

        let mut remaining = Sidecar::default();
        for (child, title) in &victim.children {
            let path = self.layout.absolute(&child.path());
            match self.move_to_bin(&path, victim.child_type, Some(title.clone())) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {e}", path.display());
                    if path.exists() {
                        let ordering = i64::try_from(remaining.len()).unwrap_or(i64::MAX);
                        remaining.insert(&child.file_name, Entry::new(title.as_str(), ordering));
                    }
                    failures.push((path, e.into()));
                }
            }
        }

        if !remaining.is_empty() {
            write_index(&dir, &remaining).map_err(|e| failed(e.into()))?;
        }
        self.journal.record(journal_id, Step::StorageMoved);
        Ok(journal_id)
    }

    fn move_to_bin(
        &self,
        path: &Path,
        resource_type: ResourceType,
        title: Option<String>,
    ) -> io::Result<RecycleRecord> {
        let recycle_bin_name = recycle_bin_name(resource_type);
        fs::rename(path, self.layout.recycling().join(&recycle_bin_name))?;
        tracing::debug!("Recycled {} as {recycle_bin_name}", path.display());
        Ok(RecycleRecord {
            old_uri: path.display().to_string(),
            recycle_bin_name,
            delete_timestamp: chrono::Utc::now().timestamp_millis(),
            resource_type,
            title,
        })
    }

    /// Moves a recycled node back into the project.
    ///
    /// Chapters always return to the chapters container. Snips and fragments
    /// are placed relative to `target` by the move rules. The node gets a
    /// fresh name, is appended at the end of its new siblings with its logged
    /// title, and its record leaves the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the record or its bin entry is missing, the target
    /// cannot receive the node, or a step fails.
    #[instrument(skip(self))]
    pub fn restore(
        &mut self,
        recycle_bin_name: &str,
        target: NodeId,
    ) -> Result<NodeKey, RestoreError> {
        let log = read_log(&self.layout.recycle_log())?;
        let record = log
            .iter()
            .find(|record| record.recycle_bin_name == recycle_bin_name)
            .cloned()
            .ok_or_else(|| RestoreError::NotInLog(recycle_bin_name.to_string()))?;

        let outline = self.outline();
        let destination = match record.resource_type {
            ResourceType::Chapter => outline.chapters(),
            ResourceType::Snip | ResourceType::Fragment => {
                placement::destination_for(outline, record.resource_type, target)?
            }
            other @ (ResourceType::Root | ResourceType::Container) => {
                return Err(RestoreError::Unrestorable(other));
            }
        };
        let destination = outline
            .get(destination)
            .ok_or(PlacementError::UnknownNode(destination))?
            .ids
            .path();

        let source = self.layout.recycling().join(recycle_bin_name);
        if !source.exists() {
            return Err(RestoreError::MissingFromBin { path: source });
        }

        let result = self.restore_into(&record, &source, &destination);
        self.settle(result)
    }

    fn restore_into(
        &self,
        record: &RecycleRecord,
        source: &Path,
        destination: &Path,
    ) -> Result<NodeKey, RestoreError> {
        let dir = self.layout.absolute(destination);
        let extension = (record.resource_type == ResourceType::Fragment)
            .then(|| self.config().fragment_extension());
        let name = generated_name(record.resource_type.as_str(), extension);

        let journal_id = self.journal.begin(
            Operation::Restore,
            &Path::new(RECYCLING_DIR).join(&record.recycle_bin_name),
            Some(destination),
        )?;

        fs::create_dir_all(&dir).map_err(|source| RestoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let title = record
            .title
            .clone()
            .unwrap_or_else(|| format!("Recovered {}", record.resource_type));
        let ordering = append_entry(&dir, &name, &title)?;
        self.journal.record(journal_id, Step::DestinationIndexed);

        let to = dir.join(&name);
        fs::rename(source, &to).map_err(|source| RestoreError::Io {
            path: to.clone(),
            source,
        })?;
        self.journal.record(journal_id, Step::StorageMoved);

        let log_path = self.layout.recycle_log();
        let mut log = read_log(&log_path)?;
        log.retain(|entry| entry.recycle_bin_name != record.recycle_bin_name);
        write_log(&log_path, &log)?;
        self.journal.record(journal_id, Step::LogAppended);
        self.journal.finish(journal_id);

        tracing::info!(
            "Restored {} to {} as '{title}' at {ordering}",
            record.recycle_bin_name,
            destination.display()
        );
        Ok(NodeKey::new(destination, name))
    }
}
