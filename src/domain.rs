//! Domain models for a writing project's outline.
//!
//! This module contains the filesystem-agnostic types: the node model, the
//! outline arena and its queries, the placement rules for relocations, and
//! configuration.

/// Node types and identity fields.
pub mod node;
pub use node::{Ids, Node, NodeId, NodeKey, NodeKind, ResourceType};

/// The in-memory outline and its traversal queries.
pub mod outline;
pub use outline::{Outline, OutlineEntry};

/// Type-compatibility rules and destination resolution.
pub mod placement;
pub use placement::{PlacementError, Relocation};

mod config;
pub use config::Config;
