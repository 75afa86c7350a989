//! The operation journal.
//!
//! Moves, removals and restores touch several files in sequence. Each one is
//! recorded in `data/.journal` before its first disk mutation, updated after
//! every completed step, and dropped once it finishes. Entries left behind
//! describe operations that were interrupted part-way.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::layout::write_atomically;

/// A multi-step operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// A relocation between containers.
    Move,
    /// A move into the recycle bin.
    Remove,
    /// A move out of the recycle bin.
    Restore,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Remove => write!(f, "remove"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// A completed step of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// The source sidecar entry was removed and its siblings shifted.
    SourceShifted,
    /// The destination sidecar entry was written.
    DestinationIndexed,
    /// The file or directory was moved.
    StorageMoved,
    /// The recycle log was updated.
    LogAppended,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceShifted => write!(f, "source-shifted"),
            Self::DestinationIndexed => write!(f, "destination-indexed"),
            Self::StorageMoved => write!(f, "storage-moved"),
            Self::LogAppended => write!(f, "log-appended"),
        }
    }
}

/// One operation in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Identifies the entry within the journal.
    pub id: Uuid,
    /// What was being done.
    pub operation: Operation,
    /// The project-relative path of the node being acted on.
    pub subject: String,
    /// The project-relative destination directory, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub started: i64,
    /// Steps completed so far, in order.
    #[serde(default)]
    pub completed: Vec<Step>,
}

impl fmt::Display for JournalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.subject)?;
        if let Some(destination) = &self.destination {
            write!(f, " -> {destination}")?;
        }
        if self.completed.is_empty() {
            write!(f, " (no steps completed)")
        } else {
            let steps: Vec<_> = self.completed.iter().map(ToString::to_string).collect();
            write!(f, " (completed: {})", steps.join(", "))
        }
    }
}

/// Errors reading or writing the journal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// The journal could not be read or written.
    #[error("failed to access journal {path}: {source}")]
    Io {
        /// The journal path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The journal is not a JSON array of entries.
    #[error("journal {path} is malformed: {source}")]
    Parse {
        /// The journal path.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },
}

/// A handle to the journal file.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Opens the journal at `path`. Nothing is read until needed.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The journal's location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every entry currently in the journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal exists but cannot be read or parsed.
    pub fn entries(&self) -> Result<Vec<JournalEntry>, JournalError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(JournalError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|source| JournalError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, entries: &[JournalEntry]) -> Result<(), JournalError> {
        let io_error = |source| JournalError::Io {
            path: self.path.clone(),
            source,
        };
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(io_error(e)),
                _ => Ok(()),
            };
        }
        let content = serde_json::to_vec_pretty(entries)
            .map_err(|source| JournalError::Parse {
                path: self.path.clone(),
                source,
            })?;
        write_atomically(&self.path, &content).map_err(io_error)
    }

    fn update(&self, edit: impl FnOnce(&mut Vec<JournalEntry>)) -> Result<(), JournalError> {
        let mut entries = self.entries()?;
        edit(&mut entries);
        self.write(&entries)
    }

    /// Records the start of an operation and returns its entry id.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be updated.
    pub fn begin(
        &self,
        operation: Operation,
        subject: &Path,
        destination: Option<&Path>,
    ) -> Result<Uuid, JournalError> {
        let id = Uuid::new_v4();
        let entry = JournalEntry {
            id,
            operation,
            subject: display_path(subject),
            destination: destination.map(display_path),
            started: chrono::Utc::now().timestamp_millis(),
            completed: Vec::new(),
        };
        self.update(|entries| entries.push(entry))?;
        Ok(id)
    }

    /// Marks a step of an operation as complete.
    ///
    /// Failing to update the journal does not undo the step, so this only
    /// logs a warning.
    pub fn record(&self, id: Uuid, step: Step) {
        let result = self.update(|entries| {
            if let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) {
                entry.completed.push(step);
            }
        });
        if let Err(e) = result {
            tracing::warn!("Could not record step {step}: {e}");
        }
    }

    /// Drops a finished operation's entry.
    pub fn finish(&self, id: Uuid) {
        if let Err(e) = self.update(|entries| entries.retain(|entry| entry.id != id)) {
            tracing::warn!("Could not close journal entry {id}: {e}");
        }
    }

    /// Removes every entry, returning how many there were.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be read or removed.
    pub fn clear(&self) -> Result<usize, JournalError> {
        let count = self.entries()?.len();
        self.write(&[])?;
        Ok(count)
    }
}

fn display_path(path: &Path) -> String {
    let parts: Vec<_> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    parts.join("/")
}
