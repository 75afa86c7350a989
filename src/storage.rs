/// Well-known paths and generated names.
pub mod layout;
pub mod sidecar;
pub mod ordering;
pub mod recycle;
pub mod journal;
mod scan;
mod project;
mod mover;
mod removal;

#[cfg(test)]
mod fixture;

pub use journal::{Journal, JournalEntry, JournalError};
pub use layout::Layout;
pub use mover::{MoveError, MoveOutcome};
pub use project::{
    CreateError, CreateOptions, Direction, InitError, LoadError, Loaded, Project, RenameError,
    ReorderError, ReorderOutcome, Unloaded,
};
pub use recycle::{RecycleLogError, RecycleRecord};
pub use removal::{RemoveError, RemoveFailures, RemoveStepError, RestoreError};
pub use scan::{ScanError, initialize_tree};
pub use sidecar::{Entry, Sidecar, SidecarError};
