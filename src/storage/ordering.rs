//! Ordering maintenance against sidecars on disk.
//!
//! These helpers read a sidecar, apply one of the [`Sidecar`] edits and write
//! it back in a single replace.

use std::path::Path;

use tracing::instrument;

use super::sidecar::{Entry, Sidecar, SidecarError, read_index, write_index};

/// Removes `name` from the sidecar of `directory` and shifts every later
/// sibling down by one.
///
/// Returns the removed entry. If the sidecar has no entry for `name` the
/// sidecar is left as it is and `None` is returned.
///
/// # Errors
///
/// Returns an error if the sidecar cannot be read or written.
#[instrument(level = "debug")]
pub fn shift_trailing_siblings_down(
    directory: &Path,
    name: &str,
) -> Result<Option<Entry>, SidecarError> {
    let mut sidecar = read_index(directory)?;
    let removed = sidecar.shift_trailing_down(name);
    match &removed {
        Some(entry) => {
            write_index(directory, &sidecar)?;
            tracing::debug!("Removed '{name}' (ordering {}) from sidecar", entry.ordering);
        }
        None => tracing::debug!("'{name}' had no sidecar entry, nothing to shift"),
    }
    Ok(removed)
}

/// Appends `name` at the end of the sidecar of `directory`.
///
/// Returns the ordering it was given.
///
/// # Errors
///
/// Returns an error if the sidecar cannot be read or written.
#[instrument(level = "debug")]
pub fn append_entry(directory: &Path, name: &str, title: &str) -> Result<i64, SidecarError> {
    let mut sidecar = read_index(directory)?;
    let ordering = sidecar.next_ordering();
    sidecar.insert(name, Entry::new(title, ordering));
    write_index(directory, &sidecar)?;
    Ok(ordering)
}

/// Moves `mover` onto `target` within the sidecar of `directory`.
///
/// Returns `false` without writing if either entry is missing.
///
/// # Errors
///
/// Returns an error if the sidecar cannot be read or written.
#[instrument(level = "debug")]
pub fn reorder_entries(directory: &Path, mover: &str, target: &str) -> Result<bool, SidecarError> {
    let mut sidecar: Sidecar = read_index(directory)?;
    if !sidecar.reorder(mover, target) {
        return Ok(false);
    }
    write_index(directory, &sidecar)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn seed(dir: &Path, entries: &[(&str, i64)]) {
        let mut sidecar = Sidecar::default();
        for (name, ordering) in entries {
            sidecar.insert(*name, Entry::new(*name, *ordering));
        }
        write_index(dir, &sidecar).unwrap();
    }

    #[test]
    fn every_later_sibling_drops_by_exactly_one() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path(), &[("a", 0), ("b", 1), ("c", 2), ("d", 5)]);

        let removed = shift_trailing_siblings_down(tmp.path(), "b").unwrap();

        assert_eq!(removed.unwrap().ordering, 1);
        let sidecar = read_index(tmp.path()).unwrap();
        assert_eq!(sidecar.get("a").unwrap().ordering, 0);
        assert_eq!(sidecar.get("c").unwrap().ordering, 1);
        assert_eq!(sidecar.get("d").unwrap().ordering, 4);
        assert!(!sidecar.contains("b"));
    }

    #[test]
    fn shifting_an_unindexed_name_leaves_the_sidecar_alone() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path(), &[("a", 3)]);

        assert!(shift_trailing_siblings_down(tmp.path(), "zzz").unwrap().is_none());
        assert_eq!(read_index(tmp.path()).unwrap().get("a").unwrap().ordering, 3);
    }

    #[test]
    fn append_uses_max_plus_one() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path(), &[("a", 4), ("self", 40)]);

        let ordering = append_entry(tmp.path(), "b", "Bee").unwrap();

        assert_eq!(ordering, 5);
        assert_eq!(
            read_index(tmp.path()).unwrap().get("b"),
            Some(&Entry::new("Bee", 5))
        );
    }

    #[test]
    fn append_to_missing_sidecar_starts_at_zero() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(append_entry(tmp.path(), "a", "A").unwrap(), 0);
    }

    #[test]
    fn reorder_persists() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path(), &[("a", 0), ("b", 1), ("c", 2)]);

        assert!(reorder_entries(tmp.path(), "c", "a").unwrap());

        let sidecar = read_index(tmp.path()).unwrap();
        assert_eq!(sidecar.get("c").unwrap().ordering, 0);
        assert_eq!(sidecar.get("a").unwrap().ordering, 1);
        assert_eq!(sidecar.get("b").unwrap().ordering, 2);
    }
}
