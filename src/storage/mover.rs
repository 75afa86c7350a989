//! Relocating nodes between containers.
//!
//! A move is validated against the type table and checked for name
//! collisions before anything on disk changes. Each relocation then runs
//! these steps, journalled as it goes:
//!
//! 1. read the destination sidecar and pick the next ordering,
//! 2. remove the mover from the source sidecar, closing the gap,
//! 3. write the destination entry with the mover's title,
//! 4. rename the file or directory.
//!
//! A failing step is reported with its path. Earlier steps are not undone.

use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
};

use tracing::instrument;

use super::{
    journal::{JournalError, Operation, Step},
    ordering::shift_trailing_siblings_down,
    project::{Loaded, Project},
    scan::ScanError,
    sidecar::{Entry, Sidecar, SidecarError, read_index, sidecar_path, write_index},
};
use crate::domain::{NodeId, NodeKey, PlacementError, Relocation, placement};

/// The result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// At least one node changed directory.
    Moved {
        /// The source and destination containers, by durable key.
        affected: Vec<NodeKey>,
    },
    /// Every mover was already in its destination.
    Unchanged,
}

/// Errors moving a node.
#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    /// The move is not allowed. Nothing was changed.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// The destination already holds an entry with the mover's name.
    /// Nothing was changed.
    #[error("cannot move: {path} already exists")]
    Collision {
        /// The occupied path.
        path: PathBuf,
    },

    /// The destination directory could not be created.
    #[error("failed to create {path}: {source}")]
    CreateDestination {
        /// The directory.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// A sidecar could not be read or written.
    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    /// The file or directory could not be renamed.
    #[error("failed to move {from} to {to}: {source}")]
    Relocate {
        /// The old path.
        from: PathBuf,
        /// The new path.
        to: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The journal could not be written, so the move was not started.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// The outline could not be rebuilt afterwards.
    #[error("moved, but the outline could not be rebuilt: {0}")]
    Rebuild(#[from] ScanError),
}

/// A relocation with everything it needs captured from the outline.
#[derive(Debug)]
struct Planned {
    mover: NodeKey,
    title: String,
    source: NodeKey,
    destination: NodeKey,
}

impl Project<Loaded> {
    /// Moves `mover` onto `target`.
    ///
    /// Fragments go to the target chapter or snip, or to the nearest one
    /// enclosing a target fragment. Snips go to the snips container of the
    /// target chapter or root, or of the nearest one enclosing the target. A
    /// snips container moves each of its snips onto the same target.
    ///
    /// Moving a node into the directory it is already in does nothing and
    /// logs a warning.
    ///
    /// # Errors
    ///
    /// Illegal moves and name collisions fail without touching the disk.
    /// Failures after the first step leave completed steps in place and name
    /// the failing path.
    #[instrument(skip(self))]
    pub fn move_node(&mut self, mover: NodeId, target: NodeId) -> Result<MoveOutcome, MoveError> {
        let relocations = placement::resolve_move(self.outline(), mover, target)?;

        let mut pending = Vec::with_capacity(relocations.len());
        for relocation in relocations {
            let planned = self.plan(relocation)?;
            if planned.mover.relative_path == planned.destination.path() {
                tracing::warn!(
                    "{} is already in {}, nothing to move",
                    planned.mover,
                    planned.destination
                );
                continue;
            }
            let occupied = self
                .layout
                .absolute(&planned.destination.path())
                .join(&planned.mover.file_name);
            if occupied.exists() {
                return Err(MoveError::Collision { path: occupied });
            }
            pending.push(planned);
        }

        if pending.is_empty() {
            return Ok(MoveOutcome::Unchanged);
        }

        let result = self.relocate_all(&pending);
        self.settle(result)
    }

    fn plan(&self, relocation: Relocation) -> Result<Planned, PlacementError> {
        let outline = self.outline();
        let mover = outline
            .get(relocation.mover)
            .ok_or(PlacementError::UnknownNode(relocation.mover))?;
        let source = outline
            .parent(relocation.mover)
            .ok_or(PlacementError::UnknownNode(relocation.mover))?;
        let destination = outline
            .get(relocation.destination)
            .ok_or(PlacementError::UnknownNode(relocation.destination))?;

        Ok(Planned {
            mover: mover.key(),
            title: mover.ids.display.clone(),
            source: source.key(),
            destination: destination.key(),
        })
    }

    fn relocate_all(&self, pending: &[Planned]) -> Result<MoveOutcome, MoveError> {
        let mut affected = BTreeSet::new();
        for planned in pending {
            self.relocate(planned)?;
            affected.insert(planned.source.clone());
            affected.insert(planned.destination.clone());
        }
        Ok(MoveOutcome::Moved {
            affected: affected.into_iter().collect(),
        })
    }

    fn relocate(&self, planned: &Planned) -> Result<(), MoveError> {
        let name = planned.mover.file_name.as_str();
        let source_dir = self.layout.absolute(&planned.mover.relative_path);
        let destination_rel = planned.destination.path();
        let destination_dir = self.layout.absolute(&destination_rel);

        let journal_id = self
            .journal
            .begin(Operation::Move, &planned.mover.path(), Some(&destination_rel))?;

        ensure_directory(&destination_dir)?;
        let mut destination = read_index(&destination_dir)?;
        let ordering = destination.next_ordering();

        let removed = shift_trailing_siblings_down(&source_dir, name)?;
        self.journal.record(journal_id, Step::SourceShifted);

        let title = removed.map_or_else(|| planned.title.clone(), |entry| entry.title);
        destination.insert(name, Entry::new(title, ordering));
        write_index(&destination_dir, &destination)?;
        self.journal.record(journal_id, Step::DestinationIndexed);

        let from = source_dir.join(name);
        let to = destination_dir.join(name);
        fs::rename(&from, &to).map_err(|source| MoveError::Relocate {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
        self.journal.record(journal_id, Step::StorageMoved);
        self.journal.finish(journal_id);

        tracing::info!("Moved {} to {} at {ordering}", planned.mover, planned.destination);
        Ok(())
    }
}

/// Creates a missing destination (a chapter's `snips` directory is made on
/// first use) along with an empty sidecar.
fn ensure_directory(dir: &Path) -> Result<(), MoveError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| MoveError::CreateDestination {
        path: dir.to_path_buf(),
        source,
    })?;
    if !sidecar_path(dir).exists() {
        write_index(dir, &Sidecar::default())?;
    }
    tracing::debug!("Created destination {}", dir.display());
    Ok(())
}
