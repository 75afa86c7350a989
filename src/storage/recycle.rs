//! The recycle log.
//!
//! Removed nodes are moved into `data/recycling/` under a generated name and
//! described by a record in `data/recycling/.log`, a JSON array that is read,
//! extended and rewritten once per batch.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::layout::write_atomically;
use crate::domain::ResourceType;

/// One recycled node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecycleRecord {
    /// The absolute path the node was removed from.
    pub old_uri: String,
    /// The node's name inside the recycle bin.
    pub recycle_bin_name: String,
    /// Milliseconds since the Unix epoch.
    pub delete_timestamp: i64,
    /// The node's type.
    pub resource_type: ResourceType,
    /// The node's title at the time of removal, if it had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Errors reading or writing the recycle log.
#[derive(Debug, thiserror::Error)]
pub enum RecycleLogError {
    /// The log exists but could not be read.
    #[error("failed to read recycle log {path}: {source}")]
    Read {
        /// The log path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The log is not a JSON array of records.
    ///
    /// The log is never overwritten in this state.
    #[error("recycle log {path} is malformed: {source}")]
    Parse {
        /// The log path.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// The log could not be written.
    #[error("failed to write recycle log {path}: {source}")]
    Write {
        /// The log path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

/// Reads every record in the log. A missing or empty log has no records.
///
/// # Errors
///
/// Returns an error if the log cannot be read or parsed.
pub fn read_log(path: &Path) -> Result<Vec<RecycleRecord>, RecycleLogError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(RecycleLogError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).map_err(|source| RecycleLogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Replaces the log with `records`.
///
/// # Errors
///
/// Returns an error if the log cannot be written.
pub fn write_log(path: &Path, records: &[RecycleRecord]) -> Result<(), RecycleLogError> {
    let write_error = |source| RecycleLogError::Write {
        path: path.to_path_buf(),
        source,
    };
    let content = serde_json::to_vec_pretty(records).map_err(io::Error::from).map_err(write_error)?;
    write_atomically(path, &content).map_err(write_error)
}

/// Appends `records` to the log in a single read-modify-write.
///
/// # Errors
///
/// Returns an error if the existing log cannot be read or the result cannot
/// be written.
pub fn append_records(path: &Path, records: &[RecycleRecord]) -> Result<(), RecycleLogError> {
    if records.is_empty() {
        return Ok(());
    }
    let mut log = read_log(path)?;
    log.extend_from_slice(records);
    write_log(path, &log)
}
