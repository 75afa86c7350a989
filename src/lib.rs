//! File-backed outline of a writing project.
//!
//! A project is a directory tree of chapters, snips and fragments. Titles and
//! sibling order live in a `.config` sidecar in each directory. The outline is
//! rebuilt from disk after every change, and removed nodes go to a recycle bin
//! instead of being deleted.

pub mod domain;
pub use domain::{Config, Node, NodeId, NodeKey, Outline, OutlineEntry, ResourceType};

/// Filesystem storage: sidecars, scanning, moves and the recycle bin.
pub mod storage;
pub use storage::{Loaded, Project, Unloaded};
