//! The node model of an outline.
//!
//! Every node carries an [`Ids`] block (title, on-disk location, ordering and
//! parent linkage) and a [`NodeKind`] payload describing its children.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// The kind of resource a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// The project root. Owns the chapters and snips containers.
    Root,
    /// A synthetic grouping of chapters or snips, backed by a directory.
    Container,
    /// A chapter directory.
    Chapter,
    /// A snip directory.
    Snip,
    /// A text file.
    Fragment,
}

impl ResourceType {
    /// The lowercase name used in generated file names and recycle records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Container => "container",
            Self::Chapter => "chapter",
            Self::Snip => "snip",
            Self::Fragment => "fragment",
        }
    }

    /// Whether nodes of this type have an entry in their parent's sidecar.
    #[must_use]
    pub const fn is_indexed(self) -> bool {
        matches!(self, Self::Chapter | Self::Snip | Self::Fragment)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ephemeral handle to a node.
///
/// Handles are tagged with the generation of the outline that produced them.
/// A handle from an older outline never resolves in a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    generation: u64,
    index: u32,
}

impl NodeId {
    pub(crate) const fn new(generation: u64, index: u32) -> Self {
        Self { generation, index }
    }

    /// The generation of the outline this handle belongs to.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }

    pub(crate) const fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.generation, self.index)
    }
}

/// The durable identity of a node: its parent directory and its leaf name.
///
/// Both are relative to the project root. The root node has an empty file
/// name and a relative path of `data`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    /// The parent directory, relative to the project root.
    pub relative_path: PathBuf,
    /// The leaf name of the backing file or directory.
    pub file_name: String,
}

impl NodeKey {
    /// Creates a key from a parent directory and a leaf name.
    pub fn new(relative_path: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            file_name: file_name.into(),
        }
    }

    /// Splits a project-relative path into a key.
    ///
    /// Returns `None` if the path has no final component.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let relative_path = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        Some(Self {
            relative_path,
            file_name,
        })
    }

    /// The project-relative path of the backing entry.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        if self.file_name.is_empty() {
            self.relative_path.clone()
        } else {
            self.relative_path.join(&self.file_name)
        }
    }

    /// The absolute path of the backing entry under `root`.
    #[must_use]
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(self.path())
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path();
        let parts: Vec<_> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        write!(f, "{}", parts.join("/"))
    }
}

/// The identity fields shared by every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ids {
    /// The human-readable title.
    pub display: String,
    /// The on-disk leaf name.
    pub file_name: String,
    /// The parent directory, relative to the project root.
    pub relative_path: PathBuf,
    /// Sort key among siblings. Lower sorts first.
    pub ordering: i64,
    /// The ephemeral handle of this node.
    pub internal: NodeId,
    /// The handle of the parent, if any.
    pub parent_internal_id: Option<NodeId>,
    /// The type of the parent, if any.
    pub parent_type: Option<ResourceType>,
}

impl Ids {
    /// The durable key of this node.
    #[must_use]
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.relative_path.clone(), self.file_name.clone())
    }

    /// The project-relative path of the backing entry.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.key().path()
    }
}

/// The per-variant payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The project root.
    Root {
        /// The chapters container.
        chapters: NodeId,
        /// The top-level snips container.
        snips: NodeId,
    },
    /// A grouping of chapters or snips.
    Container {
        /// Children in ordering order.
        contents: Vec<NodeId>,
    },
    /// A chapter with its fragments and its own snips container.
    Chapter {
        /// Fragments in ordering order.
        text_data: Vec<NodeId>,
        /// The chapter's snips container.
        snips: NodeId,
    },
    /// A snip with its fragments and any nested snips.
    Snip {
        /// Fragments in ordering order.
        text_data: Vec<NodeId>,
        /// Nested snips in ordering order.
        snips: Vec<NodeId>,
    },
    /// A text file.
    Fragment {
        /// The first few hundred bytes of the file.
        preview: String,
    },
}

/// A node in an [`Outline`](super::Outline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Identity fields.
    pub ids: Ids,
    /// Variant payload.
    pub kind: NodeKind,
}

impl Node {
    /// The resource type, derived from the payload.
    #[must_use]
    pub const fn resource_type(&self) -> ResourceType {
        match self.kind {
            NodeKind::Root { .. } => ResourceType::Root,
            NodeKind::Container { .. } => ResourceType::Container,
            NodeKind::Chapter { .. } => ResourceType::Chapter,
            NodeKind::Snip { .. } => ResourceType::Snip,
            NodeKind::Fragment { .. } => ResourceType::Fragment,
        }
    }

    /// The ephemeral handle of this node.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.ids.internal
    }

    /// The durable key of this node.
    #[must_use]
    pub fn key(&self) -> NodeKey {
        self.ids.key()
    }

    /// The handles of this node's children, in no particular order.
    #[must_use]
    pub fn child_ids(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Root { chapters, snips } => vec![*chapters, *snips],
            NodeKind::Container { contents } => contents.clone(),
            NodeKind::Chapter { text_data, snips } => {
                let mut ids = text_data.clone();
                ids.push(*snips);
                ids
            }
            NodeKind::Snip { text_data, snips } => {
                text_data.iter().chain(snips.iter()).copied().collect()
            }
            NodeKind::Fragment { .. } => Vec::new(),
        }
    }

    /// The fragment preview, if this node is a fragment.
    #[must_use]
    pub fn preview(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Fragment { preview } => Some(preview),
            _ => None,
        }
    }
}
