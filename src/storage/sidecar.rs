//! Per-directory sidecar index files.
//!
//! Each indexed directory holds a `.config` JSON object mapping child names to
//! `{ "title": ..., "ordering": ... }`. The sidecar is the only source of
//! titles and sibling order for the directory's children.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::layout::{SIDECAR_FILE, write_atomically};

/// The reserved key describing the directory itself.
pub const SELF_KEY: &str = "self";

/// One child's title and ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The display title.
    pub title: String,
    /// The sort key among siblings.
    pub ordering: i64,
}

impl Entry {
    /// Creates an entry.
    pub fn new(title: impl Into<String>, ordering: i64) -> Self {
        Self {
            title: title.into(),
            ordering,
        }
    }
}

/// The parsed contents of one `.config` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sidecar {
    entries: BTreeMap<String, Entry>,
}

impl Sidecar {
    /// Looks up a child's entry. The `self` entry is never returned.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        if name == SELF_KEY {
            return None;
        }
        self.entries.get(name)
    }

    /// Whether the sidecar has an entry for a child.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts or replaces a child's entry.
    pub fn insert(&mut self, name: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.entries.insert(name.into(), entry)
    }

    /// Removes a child's entry without touching its siblings.
    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    /// The child entries, excluding `self`.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries
            .iter()
            .filter(|(name, _)| name.as_str() != SELF_KEY)
            .map(|(name, entry)| (name.as_str(), entry))
    }

    /// The number of child entries, excluding `self`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children().count()
    }

    /// Whether there are no child entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The largest child ordering, or `-1` if there are no children.
    #[must_use]
    pub fn latest_ordering(&self) -> i64 {
        self.children()
            .map(|(_, entry)| entry.ordering)
            .max()
            .unwrap_or(-1)
    }

    /// The ordering that appends a new child at the end.
    ///
    /// Saturates at `i64::MAX`. Ties then sort by file name.
    #[must_use]
    pub fn next_ordering(&self) -> i64 {
        self.latest_ordering().saturating_add(1)
    }

    /// Removes a child and closes the gap it leaves.
    ///
    /// Every sibling ordered after the removed entry moves down by one.
    /// Returns the removed entry, or `None` if there was none.
    pub fn shift_trailing_down(&mut self, name: &str) -> Option<Entry> {
        if name == SELF_KEY {
            return None;
        }
        let removed = self.entries.remove(name)?;
        for (_, entry) in self
            .entries
            .iter_mut()
            .filter(|(key, _)| key.as_str() != SELF_KEY)
        {
            if entry.ordering > removed.ordering {
                entry.ordering = entry.ordering.saturating_sub(1);
            }
        }
        Some(removed)
    }

    /// Gives `mover` the ordering of `target` and shifts everything between
    /// them one slot toward the mover's old position.
    ///
    /// Returns `false`, leaving the sidecar untouched, if either entry is
    /// missing.
    pub fn reorder(&mut self, mover: &str, target: &str) -> bool {
        let (Some(from), Some(to)) = (
            self.get(mover).map(|e| e.ordering),
            self.get(target).map(|e| e.ordering),
        ) else {
            return false;
        };

        for (name, entry) in &mut self.entries {
            if name == SELF_KEY || name == mover {
                continue;
            }
            if from < to && entry.ordering > from && entry.ordering <= to {
                entry.ordering = entry.ordering.saturating_sub(1);
            } else if from > to && entry.ordering >= to && entry.ordering < from {
                entry.ordering = entry.ordering.saturating_add(1);
            }
        }
        if let Some(entry) = self.entries.get_mut(mover) {
            entry.ordering = to;
        }
        true
    }
}

/// Errors reading or writing a sidecar. Each names the sidecar's path.
#[derive(Debug, thiserror::Error)]
pub enum SidecarError {
    /// The file exists but could not be read.
    #[error("failed to read sidecar {path}: {source}")]
    Read {
        /// The sidecar path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The file is not a valid sidecar.
    #[error("failed to parse sidecar {path}: {source}")]
    Parse {
        /// The sidecar path.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// The sidecar could not be serialized.
    #[error("failed to serialize sidecar {path}: {source}")]
    Serialize {
        /// The sidecar path.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// The file could not be written.
    #[error("failed to write sidecar {path}: {source}")]
    Write {
        /// The sidecar path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

/// The sidecar path for a directory.
#[must_use]
pub fn sidecar_path(directory: &Path) -> PathBuf {
    directory.join(SIDECAR_FILE)
}

/// Reads the sidecar of `directory`.
///
/// A missing file reads as an empty sidecar.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn read_index(directory: &Path) -> Result<Sidecar, SidecarError> {
    let path = sidecar_path(directory);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No sidecar at {}, treating as empty", path.display());
            return Ok(Sidecar::default());
        }
        Err(source) => return Err(SidecarError::Read { path, source }),
    };
    if content.trim().is_empty() {
        return Ok(Sidecar::default());
    }
    serde_json::from_str(&content).map_err(|source| SidecarError::Parse { path, source })
}

/// Writes the sidecar of `directory`, replacing it atomically.
///
/// # Errors
///
/// Returns an error if the sidecar cannot be serialized or written.
pub fn write_index(directory: &Path, sidecar: &Sidecar) -> Result<(), SidecarError> {
    let path = sidecar_path(directory);
    let content = serde_json::to_vec_pretty(sidecar).map_err(|source| SidecarError::Serialize {
        path: path.clone(),
        source,
    })?;
    write_atomically(&path, &content).map_err(|source| SidecarError::Write { path, source })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn sidecar(entries: &[(&str, i64)]) -> Sidecar {
        let mut sidecar = Sidecar::default();
        for (name, ordering) in entries {
            sidecar.insert(*name, Entry::new(name.to_uppercase(), *ordering));
        }
        sidecar
    }

    fn orderings(sidecar: &Sidecar) -> Vec<(String, i64)> {
        let mut all: Vec<_> = sidecar
            .children()
            .map(|(name, entry)| (name.to_string(), entry.ordering))
            .collect();
        all.sort_by_key(|(_, ordering)| *ordering);
        all
    }

    #[test]
    fn latest_ordering_of_empty_sidecar_is_minus_one() {
        assert_eq!(Sidecar::default().latest_ordering(), -1);
        assert_eq!(Sidecar::default().next_ordering(), 0);
    }

    #[test]
    fn next_ordering_saturates_at_the_maximum() {
        let s = sidecar(&[("a", i64::MAX)]);
        assert_eq!(s.next_ordering(), i64::MAX);
    }

    #[test]
    fn extreme_orderings_shift_and_reorder_without_overflow() {
        let mut s = sidecar(&[("a", i64::MIN), ("b", 0), ("c", i64::MAX)]);
        assert!(s.reorder("c", "a"));
        assert_eq!(
            orderings(&s),
            [
                ("c".to_string(), i64::MIN),
                ("a".to_string(), i64::MIN + 1),
                ("b".to_string(), 1),
            ]
        );

        s.shift_trailing_down("c");
        assert_eq!(
            orderings(&s),
            [("a".to_string(), i64::MIN), ("b".to_string(), 0)]
        );
    }

    #[test]
    fn latest_ordering_ignores_self() {
        let s = sidecar(&[("a", 3), ("b", 7), ("self", 99)]);
        assert_eq!(s.latest_ordering(), 7);
        assert_eq!(s.len(), 2);
        assert!(s.get("self").is_none());
    }

    #[test]
    fn shift_closes_the_gap() {
        let mut s = sidecar(&[("a", 0), ("b", 1), ("c", 2), ("d", 3)]);
        let removed = s.shift_trailing_down("b").unwrap();
        assert_eq!(removed.title, "B");
        assert_eq!(
            orderings(&s),
            [("a".into(), 0), ("c".into(), 1), ("d".into(), 2)]
        );
    }

    #[test]
    fn shift_of_unknown_entry_is_a_no_op() {
        let mut s = sidecar(&[("a", 0)]);
        assert!(s.shift_trailing_down("z").is_none());
        assert_eq!(orderings(&s), [("a".into(), 0)]);
    }

    #[test]
    fn reorder_down_shifts_intermediate_entries_up() {
        let mut s = sidecar(&[("a", 0), ("b", 1), ("c", 2), ("d", 3)]);
        assert!(s.reorder("a", "c"));
        assert_eq!(
            orderings(&s),
            [
                ("b".into(), 0),
                ("c".into(), 1),
                ("a".into(), 2),
                ("d".into(), 3)
            ]
        );
    }

    #[test]
    fn reorder_up_shifts_intermediate_entries_down() {
        let mut s = sidecar(&[("a", 0), ("b", 1), ("c", 2), ("d", 3)]);
        assert!(s.reorder("d", "b"));
        assert_eq!(
            orderings(&s),
            [
                ("a".into(), 0),
                ("d".into(), 1),
                ("b".into(), 2),
                ("c".into(), 3)
            ]
        );
    }

    #[test]
    fn reorder_with_sparse_orderings_stays_collision_free() {
        let mut s = sidecar(&[("a", 0), ("b", 10), ("c", 20)]);
        assert!(s.reorder("c", "a"));
        let values: Vec<_> = orderings(&s).into_iter().map(|(_, o)| o).collect();
        assert_eq!(values, [0, 1, 11]);
        assert_eq!(orderings(&s)[0].0, "c");
    }

    #[test]
    fn reorder_with_missing_entry_changes_nothing() {
        let mut s = sidecar(&[("a", 0)]);
        let before = s.clone();
        assert!(!s.reorder("a", "missing"));
        assert_eq!(s, before);
    }

    #[test]
    fn write_then_read_round_trips() {
        let tmp = TempDir::new().unwrap();
        let s = sidecar(&[("chapter-1", 0), ("self", 5), ("chapter-2", 4)]);

        write_index(tmp.path(), &s).unwrap();
        let read = read_index(tmp.path()).unwrap();

        assert_eq!(read, s);
    }

    #[test]
    fn missing_sidecar_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(read_index(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn malformed_sidecar_names_its_path() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SIDECAR_FILE), "{ not json").unwrap();

        let err = read_index(tmp.path()).unwrap_err();

        assert!(matches!(err, SidecarError::Parse { .. }));
        assert!(err.to_string().contains(".config"));
    }

    #[test]
    fn reads_the_flat_object_format() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(SIDECAR_FILE),
            r#"{"a.wt": {"title": "Opening", "ordering": 2}}"#,
        )
        .unwrap();

        let s = read_index(tmp.path()).unwrap();

        assert_eq!(s.get("a.wt"), Some(&Entry::new("Opening", 2)));
    }
}
