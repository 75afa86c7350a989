//! An in-memory outline of a writing project.
//!
//! The [`Outline`] knows nothing about the filesystem. It is an arena of
//! [`Node`]s produced by the scanner, addressed by generation-tagged
//! [`NodeId`]s, and it answers the traversal queries the engine needs.

use std::{
    collections::HashSet,
    path::Path,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

use tracing::instrument;

use super::node::{Ids, Node, NodeId, NodeKey, NodeKind, ResourceType};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// An immutable snapshot of the project tree.
#[derive(Debug, Clone)]
pub struct Outline {
    generation: u64,
    nodes: Vec<Node>,
    root: NodeId,
}

/// One row of a depth-first walk, used to compare outlines structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    /// Distance from the root.
    pub depth: usize,
    /// The node's type.
    pub resource_type: ResourceType,
    /// The node's title.
    pub title: String,
    /// The node's ordering.
    pub ordering: i64,
    /// The node's durable key.
    pub key: NodeKey,
}

impl Outline {
    /// The generation stamped on every id in this outline.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The number of nodes, including the root and containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// An outline always has a root, so this is never true.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root node's id.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// The chapters container.
    #[must_use]
    pub fn chapters(&self) -> NodeId {
        match self.at(self.root).kind {
            NodeKind::Root { chapters, .. } => chapters,
            _ => unreachable!("outline root is always a root node"),
        }
    }

    /// The top-level snips container.
    #[must_use]
    pub fn snips(&self) -> NodeId {
        match self.at(self.root).kind {
            NodeKind::Root { snips, .. } => snips,
            _ => unreachable!("outline root is always a root node"),
        }
    }

    /// Looks up a node by id.
    ///
    /// Returns `None` for ids minted by a different outline.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.generation() != self.generation {
            return None;
        }
        self.nodes.get(id.index())
    }

    /// Whether `id` belongs to this outline.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn at(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// The parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        let parent = self.get(id)?.ids.parent_internal_id?;
        self.get(parent)
    }

    /// The parent chain of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        std::iter::successors(self.parent(id), move |node| self.parent(node.id()))
    }

    /// The nearest ancestor whose type satisfies `accept`.
    pub fn enclosing(
        &self,
        id: NodeId,
        accept: impl Fn(ResourceType) -> bool,
    ) -> Option<&Node> {
        self.ancestors(id).find(|node| accept(node.resource_type()))
    }

    /// The children of a node in ordering order.
    ///
    /// A chapter lists its fragments followed by its snips container. A snip
    /// interleaves fragments and nested snips, since they share one sidecar.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<&Node> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        match &node.kind {
            NodeKind::Snip { text_data, snips } => {
                let mut children: Vec<&Node> = text_data
                    .iter()
                    .chain(snips.iter())
                    .map(|&child| self.at(child))
                    .collect();
                children.sort_by_key(|child| child.ids.ordering);
                children
            }
            _ => node
                .child_ids()
                .into_iter()
                .map(|child| self.at(child))
                .collect(),
        }
    }

    /// A depth-first, pre-order walk yielding each node with its depth.
    pub fn walk(&self) -> impl Iterator<Item = (usize, &Node)> + '_ {
        let mut stack = vec![(0, self.root)];
        std::iter::from_fn(move || {
            let (depth, id) = stack.pop()?;
            let node = self.at(id);
            stack.extend(
                self.children(id)
                    .into_iter()
                    .rev()
                    .map(|child| (depth + 1, child.id())),
            );
            Some((depth, node))
        })
    }

    /// All nodes in depth-first, pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.walk().map(|(_, node)| node)
    }

    /// The structural content of the outline, ignoring ephemeral ids.
    #[must_use]
    pub fn entries(&self) -> Vec<OutlineEntry> {
        self.walk()
            .map(|(depth, node)| OutlineEntry {
                depth,
                resource_type: node.resource_type(),
                title: node.ids.display.clone(),
                ordering: node.ids.ordering,
                key: node.key(),
            })
            .collect()
    }

    /// Finds a node by its durable key.
    #[must_use]
    pub fn find_by_key(&self, key: &NodeKey) -> Option<&Node> {
        self.iter()
            .find(|node| node.ids.relative_path == key.relative_path && node.ids.file_name == key.file_name)
    }

    /// Finds a node by its project-relative path.
    #[must_use]
    pub fn find_by_path(&self, path: &Path) -> Option<&Node> {
        self.iter().find(|node| node.ids.path() == path)
    }

    /// Counts the nodes of one type.
    #[must_use]
    pub fn count(&self, resource_type: ResourceType) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.resource_type() == resource_type)
            .count()
    }

    /// Reduces a selection to its local roots.
    ///
    /// A node is dropped if any of its ancestors is also selected. Unknown ids
    /// and duplicates are dropped. The order of the selection is preserved.
    #[instrument(skip(self, selection), fields(selected = selection.len()))]
    #[must_use]
    pub fn local_roots(&self, selection: &[NodeId]) -> Vec<NodeId> {
        let selected: HashSet<NodeId> = selection
            .iter()
            .copied()
            .filter(|&id| self.contains(id))
            .collect();
        let mut seen = HashSet::new();

        selection
            .iter()
            .copied()
            .filter(|id| selected.contains(id))
            .filter(|&id| {
                !self
                    .ancestors(id)
                    .any(|ancestor| selected.contains(&ancestor.id()))
            })
            .filter(|&id| seen.insert(id))
            .collect()
    }
}

/// Assembles an [`Outline`] one node at a time.
///
/// Child lists may be filled in any order; they are sorted by ordering when
/// the outline is finished, keeping insertion order for ties.
#[derive(Debug)]
pub(crate) struct OutlineBuilder {
    generation: u64,
    nodes: Vec<Node>,
}

impl OutlineBuilder {
    pub(crate) fn new() -> Self {
        Self {
            generation: NEXT_GENERATION.fetch_add(1, AtomicOrdering::Relaxed),
            nodes: Vec::new(),
        }
    }

    /// Adds a node and returns its id.
    ///
    /// Nodes whose children are not known yet can be inserted with an empty
    /// container payload and completed with [`Self::set_kind`].
    pub(crate) fn insert(
        &mut self,
        parent: Option<(NodeId, ResourceType)>,
        key: NodeKey,
        display: String,
        ordering: i64,
        kind: NodeKind,
    ) -> NodeId {
        let index = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        let id = NodeId::new(self.generation, index);
        self.nodes.push(Node {
            ids: Ids {
                display,
                file_name: key.file_name,
                relative_path: key.relative_path,
                ordering,
                internal: id,
                parent_internal_id: parent.map(|(parent, _)| parent),
                parent_type: parent.map(|(_, resource_type)| resource_type),
            },
            kind,
        });
        id
    }

    pub(crate) fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.index()].kind = kind;
    }

    pub(crate) fn finish(mut self, root: NodeId) -> Outline {
        let orderings: Vec<i64> = self.nodes.iter().map(|node| node.ids.ordering).collect();
        let by_ordering = |ids: &mut Vec<NodeId>| ids.sort_by_key(|id| orderings[id.index()]);

        for node in &mut self.nodes {
            match &mut node.kind {
                NodeKind::Container { contents } => by_ordering(contents),
                NodeKind::Chapter { text_data, .. } => by_ordering(text_data),
                NodeKind::Snip { text_data, snips } => {
                    by_ordering(text_data);
                    by_ordering(snips);
                }
                NodeKind::Root { .. } | NodeKind::Fragment { .. } => {}
            }
        }

        Outline {
            generation: self.generation,
            nodes: self.nodes,
            root,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small outline:
    ///
    /// ```text
    /// root
    /// ├── chapters
    /// │   └── ch1 (fragments f1, f2; snips container holding s1)
    /// └── snips
    ///     └── top (fragment tf)
    /// ```
    pub(crate) struct Sample {
        pub outline: Outline,
        pub ch1: NodeId,
        pub f1: NodeId,
        pub f2: NodeId,
        pub ch1_snips: NodeId,
        pub s1: NodeId,
        pub top: NodeId,
        pub tf: NodeId,
    }

    fn empty() -> NodeKind {
        NodeKind::Container {
            contents: Vec::new(),
        }
    }

    fn fragment() -> NodeKind {
        NodeKind::Fragment {
            preview: String::new(),
        }
    }

    pub(crate) fn sample() -> Sample {
        let mut b = OutlineBuilder::new();
        let root = b.insert(None, NodeKey::new("data", ""), "root".into(), 0, empty());
        let chapters = b.insert(
            Some((root, ResourceType::Root)),
            NodeKey::new("data", "chapters"),
            "Chapters".into(),
            0,
            empty(),
        );
        let snips = b.insert(
            Some((root, ResourceType::Root)),
            NodeKey::new("data", "snips"),
            "Work Snips".into(),
            1,
            empty(),
        );
        b.set_kind(root, NodeKind::Root { chapters, snips });

        let ch1 = b.insert(
            Some((chapters, ResourceType::Container)),
            NodeKey::new("data/chapters", "ch1"),
            "One".into(),
            0,
            empty(),
        );
        b.set_kind(chapters, NodeKind::Container { contents: vec![ch1] });

        let ch1_dir = "data/chapters/ch1";
        let f2 = b.insert(
            Some((ch1, ResourceType::Chapter)),
            NodeKey::new(ch1_dir, "f2.wt"),
            "Second".into(),
            1,
            fragment(),
        );
        let f1 = b.insert(
            Some((ch1, ResourceType::Chapter)),
            NodeKey::new(ch1_dir, "f1.wt"),
            "First".into(),
            0,
            fragment(),
        );
        let ch1_snips = b.insert(
            Some((ch1, ResourceType::Chapter)),
            NodeKey::new(ch1_dir, "snips"),
            "Snips".into(),
            1_000_000,
            empty(),
        );
        b.set_kind(
            ch1,
            NodeKind::Chapter {
                text_data: vec![f2, f1],
                snips: ch1_snips,
            },
        );
        let s1 = b.insert(
            Some((ch1_snips, ResourceType::Container)),
            NodeKey::new("data/chapters/ch1/snips", "s1"),
            "Aside".into(),
            0,
            NodeKind::Snip {
                text_data: Vec::new(),
                snips: Vec::new(),
            },
        );
        b.set_kind(ch1_snips, NodeKind::Container { contents: vec![s1] });

        let top = b.insert(
            Some((snips, ResourceType::Container)),
            NodeKey::new("data/snips", "top"),
            "Top".into(),
            0,
            empty(),
        );
        b.set_kind(snips, NodeKind::Container { contents: vec![top] });
        let tf = b.insert(
            Some((top, ResourceType::Snip)),
            NodeKey::new("data/snips/top", "tf.wt"),
            "Top fragment".into(),
            0,
            fragment(),
        );
        b.set_kind(
            top,
            NodeKind::Snip {
                text_data: vec![tf],
                snips: Vec::new(),
            },
        );

        Sample {
            outline: b.finish(root),
            ch1,
            f1,
            f2,
            ch1_snips,
            s1,
            top,
            tf,
        }
    }

    #[test]
    fn children_are_sorted_by_ordering() {
        let s = sample();
        let titles: Vec<_> = s
            .outline
            .children(s.ch1)
            .iter()
            .map(|node| node.ids.display.as_str())
            .collect();
        assert_eq!(titles, ["First", "Second", "Snips"]);
    }

    #[test]
    fn ids_from_another_outline_do_not_resolve() {
        let first = sample();
        let second = sample();
        assert!(first.outline.get(first.f1).is_some());
        assert!(second.outline.get(first.f1).is_none());
        assert!(second.outline.find_by_key(&NodeKey::new("data/chapters/ch1", "f1.wt")).is_some());
    }

    #[test]
    fn ancestors_walk_to_the_root() {
        let s = sample();
        let chain: Vec<_> = s
            .outline
            .ancestors(s.s1)
            .map(Node::resource_type)
            .collect();
        assert_eq!(
            chain,
            [
                ResourceType::Container,
                ResourceType::Chapter,
                ResourceType::Container,
                ResourceType::Root
            ]
        );
    }

    #[test]
    fn enclosing_finds_the_nearest_match() {
        let s = sample();
        let found = s
            .outline
            .enclosing(s.tf, |t| matches!(t, ResourceType::Chapter | ResourceType::Snip))
            .unwrap();
        assert_eq!(found.id(), s.top);
    }

    #[test]
    fn local_roots_drop_nodes_with_a_selected_ancestor() {
        let s = sample();
        let roots = s.outline.local_roots(&[s.f1, s.ch1, s.s1, s.tf, s.ch1]);
        assert_eq!(roots, vec![s.ch1, s.tf]);
    }

    #[test]
    fn local_roots_ignore_unrelated_ancestors() {
        let s = sample();
        let roots = s.outline.local_roots(&[s.f1, s.f2, s.ch1_snips]);
        assert_eq!(roots, vec![s.f1, s.f2, s.ch1_snips]);
    }

    #[test]
    fn find_by_path_matches_relative_paths() {
        let s = sample();
        let node = s
            .outline
            .find_by_path(Path::new("data/chapters/ch1/snips/s1"))
            .unwrap();
        assert_eq!(node.id(), s.s1);
        assert_eq!(
            s.outline.find_by_path(Path::new("data")).unwrap().id(),
            s.outline.root()
        );
    }

    #[test]
    fn walk_is_preorder() {
        let s = sample();
        let keys: Vec<_> = s
            .outline
            .entries()
            .into_iter()
            .map(|entry| (entry.depth, entry.key.to_string()))
            .collect();
        assert_eq!(
            keys,
            [
                (0, "data".to_string()),
                (1, "data/chapters".to_string()),
                (2, "data/chapters/ch1".to_string()),
                (3, "data/chapters/ch1/f1.wt".to_string()),
                (3, "data/chapters/ch1/f2.wt".to_string()),
                (3, "data/chapters/ch1/snips".to_string()),
                (4, "data/chapters/ch1/snips/s1".to_string()),
                (1, "data/snips".to_string()),
                (2, "data/snips/top".to_string()),
                (3, "data/snips/top/tf.wt".to_string()),
            ]
        );
    }
}
