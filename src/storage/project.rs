//! A filesystem backed writing project.
//!
//! The [`Project`] owns the project root, its configuration, the journal and
//! the current [`Outline`]. Every mutating operation takes `&mut self` and
//! rebuilds the outline from disk before returning, so node ids handed out
//! before a mutation never resolve after it.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use non_empty_string::NonEmptyString;
use tracing::instrument;

use super::{
    journal::{Journal, JournalEntry, JournalError},
    layout::{CHAPTERS_DIR, DATA_DIR, Layout, SNIPS_DIR, generated_name},
    ordering,
    scan::{ScanError, initialize_tree},
    sidecar::{Entry, Sidecar, SidecarError, read_index, sidecar_path, write_index},
};
use crate::domain::{
    Config, Node, NodeId, NodeKey, Outline, PlacementError, ResourceType, placement,
};

/// A project whose outline has been built.
#[derive(Debug, Clone)]
pub struct Loaded {
    outline: Outline,
    config: Config,
    interrupted: Vec<JournalEntry>,
}

/// A project that has not been scanned yet.
#[derive(Debug, PartialEq, Eq)]
pub struct Unloaded;

/// A writing project on disk.
#[derive(Debug)]
pub struct Project<S> {
    pub(super) layout: Layout,
    pub(super) journal: Journal,
    pub(super) state: S,
}

impl<S> Project<S> {
    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Well-known locations in the project.
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The operation journal. It can be read without building the outline.
    #[must_use]
    pub const fn journal(&self) -> &Journal {
        &self.journal
    }
}

impl Project<Unloaded> {
    /// Opens a project at the given path.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        let layout = Layout::new(root);
        let journal = Journal::new(layout.journal());
        Self {
            layout,
            journal,
            state: Unloaded,
        }
    }

    /// Creates the project skeleton: `data/chapters`, `data/snips` and
    /// `data/recycling`, empty sidecars, and a default configuration file.
    ///
    /// Existing directories, sidecars and configuration are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory or file cannot be created.
    #[instrument(skip(self), fields(root = %self.root().display()))]
    pub fn init(&self) -> Result<(), InitError> {
        for dir in [
            self.layout.chapters(),
            self.layout.snips(),
            self.layout.recycling(),
        ] {
            fs::create_dir_all(&dir).map_err(|source| InitError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        for dir in [self.layout.chapters(), self.layout.snips()] {
            if !sidecar_path(&dir).exists() {
                write_index(&dir, &Sidecar::default())?;
            }
        }

        let config_path = self.layout.config_file();
        if !config_path.exists() {
            Config::default()
                .save(&config_path)
                .map_err(InitError::Config)?;
        }

        tracing::info!("Initialized project at {}", self.root().display());
        Ok(())
    }

    /// Loads the configuration and builds the outline.
    ///
    /// A missing configuration file means defaults. Entries left in the
    /// journal by interrupted operations are logged as warnings and exposed
    /// through [`Project::interrupted`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or journal is unreadable, or if
    /// the scan fails.
    pub fn load(self) -> Result<Project<Loaded>, LoadError> {
        let config = load_config(&self.layout)?;
        let outline = initialize_tree(self.layout.root(), &config)?;
        let interrupted = self.journal.entries()?;
        report_interrupted(&interrupted);

        Ok(Project {
            layout: self.layout,
            journal: self.journal,
            state: Loaded {
                outline,
                config,
                interrupted,
            },
        })
    }
}

fn load_config(layout: &Layout) -> Result<Config, LoadError> {
    let path = layout.config_file();
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(&path).map_err(|reason| LoadError::Config { path, reason })
}

fn report_interrupted(entries: &[JournalEntry]) {
    for entry in entries {
        tracing::warn!("Interrupted operation in journal: {entry}");
    }
}

/// A request for a new chapter, snip or fragment.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// The title. A numbered default is used if absent.
    pub title: Option<NonEmptyString>,
    /// Do not create the initial fragment of a chapter or snip.
    pub skip_fragment: bool,
}

/// Which way [`Project::nudge`] moves a node among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the start.
    Up,
    /// Towards the end.
    Down,
}

/// The result of a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// The sidecar was rewritten.
    Reordered,
    /// The node was already in place.
    Unchanged,
}

impl Project<Loaded> {
    /// The current outline.
    #[must_use]
    pub const fn outline(&self) -> &Outline {
        &self.state.outline
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.state.config
    }

    /// Operations that were interrupted before they finished, as found when
    /// the outline was last built.
    #[must_use]
    pub fn interrupted(&self) -> &[JournalEntry] {
        &self.state.interrupted
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.state.outline.get(id)
    }

    /// Resolves an absolute or project-relative path to a node.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> Option<NodeId> {
        let relative = self.layout.relative(path)?;
        self.state
            .outline
            .find_by_path(&relative)
            .map(Node::id)
    }

    /// Reduces a selection to its local roots.
    #[must_use]
    pub fn local_roots(&self, selection: &[NodeId]) -> Vec<NodeId> {
        self.state.outline.local_roots(selection)
    }

    /// Rebuilds the outline from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails. The previous outline is kept.
    pub fn reload(&mut self) -> Result<(), ScanError> {
        self.state.outline = initialize_tree(self.layout.root(), &self.state.config)?;
        match self.journal.entries() {
            Ok(entries) => {
                report_interrupted(&entries);
                self.state.interrupted = entries;
            }
            Err(e) => tracing::warn!("Could not read journal: {e}"),
        }
        Ok(())
    }

    /// Rebuilds after a mutation, whether or not it succeeded.
    ///
    /// A rebuild failure replaces a successful result. After a failed
    /// mutation the original error wins and the rebuild failure is logged.
    pub(super) fn settle<T, E>(&mut self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<ScanError>,
    {
        match (result, self.reload()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(scan)) => Err(scan.into()),
            (Err(e), reload) => {
                if let Err(scan) = reload {
                    tracing::error!("Rebuild after failed operation also failed: {scan}");
                }
                Err(e)
            }
        }
    }

    /// Drops every journal entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be read or removed.
    pub fn clear_journal(&mut self) -> Result<usize, JournalError> {
        let count = self.journal.clear()?;
        self.state.interrupted.clear();
        tracing::info!("Cleared {count} journal entries");
        Ok(count)
    }

    fn fragment_name(&self) -> String {
        generated_name("fragment", Some(self.state.config.fragment_extension()))
    }

    /// Creates a chapter at the end of the chapters container.
    ///
    /// The chapter gets an empty `snips` directory and, unless skipped, one
    /// empty fragment titled "New Fragment".
    ///
    /// # Errors
    ///
    /// Returns an error naming the path that could not be written.
    #[instrument(skip(self))]
    pub fn new_chapter(&mut self, options: CreateOptions) -> Result<NodeKey, CreateError> {
        let result = self.create_chapter(&options);
        self.settle(result)
    }

    fn create_chapter(&self, options: &CreateOptions) -> Result<NodeKey, CreateError> {
        let chapters = self.layout.chapters();
        let mut index = read_index(&chapters)?;
        let ordering = index.next_ordering();
        let name = generated_name("chapter", None);
        let title = title_or(options, || format!("New Chapter ({ordering})"));

        index.insert(name.clone(), Entry::new(title, ordering));
        write_index(&chapters, &index)?;

        let dir = chapters.join(&name);
        create_dir(&dir)?;
        let snips = dir.join(SNIPS_DIR);
        create_dir(&snips)?;
        write_index(&snips, &Sidecar::default())?;

        let mut own = Sidecar::default();
        if !options.skip_fragment {
            let fragment = self.fragment_name();
            create_file(&dir.join(&fragment))?;
            own.insert(fragment, Entry::new("New Fragment", 0));
        }
        write_index(&dir, &own)?;

        tracing::info!("Created chapter {name}");
        Ok(NodeKey::new(
            Path::new(DATA_DIR).join(CHAPTERS_DIR),
            name,
        ))
    }

    /// Creates a snip relative to `at`.
    ///
    /// A snip target gets a nested snip, a chapter or fragment puts the snip
    /// in the nearest chapter's (or the root's) snips container, and a snips
    /// container takes it directly. The chapters container is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot hold a snip or a path cannot be
    /// written.
    #[instrument(skip(self))]
    pub fn new_snip(&mut self, at: NodeId, options: CreateOptions) -> Result<NodeKey, CreateError> {
        let home = placement::snip_home(&self.state.outline, at)?;
        let result = self.create_snip(home, &options);
        self.settle(result)
    }

    fn create_snip(&self, home: NodeId, options: &CreateOptions) -> Result<NodeKey, CreateError> {
        let home_path = self.node_path(home)?;
        let parent = self.layout.absolute(&home_path);
        if !parent.is_dir() {
            fs::create_dir_all(&parent).map_err(|source| CreateError::Io {
                path: parent.clone(),
                source,
            })?;
        }

        let mut index = read_index(&parent)?;
        let ordering = index.next_ordering();
        let name = generated_name("snip", None);
        let title = title_or(options, || format!("New Snip ({ordering})"));

        index.insert(name.clone(), Entry::new(title, ordering));
        write_index(&parent, &index)?;

        let dir = parent.join(&name);
        create_dir(&dir)?;
        let mut own = Sidecar::default();
        if !options.skip_fragment {
            let fragment = self.fragment_name();
            create_file(&dir.join(&fragment))?;
            own.insert(fragment, Entry::new("New Fragment (0)", 0));
        }
        write_index(&dir, &own)?;

        tracing::info!("Created snip {name} in {}", home_path.display());
        Ok(NodeKey::new(home_path, name))
    }

    /// Creates an empty fragment relative to `at`.
    ///
    /// A chapter or snip target receives the fragment; a fragment target puts
    /// it beside that fragment. Roots and containers are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot hold a fragment or a path cannot
    /// be written.
    #[instrument(skip(self))]
    pub fn new_fragment(
        &mut self,
        at: NodeId,
        options: CreateOptions,
    ) -> Result<NodeKey, CreateError> {
        let home = placement::fragment_home(&self.state.outline, at)?;
        let result = self.create_fragment(home, &options);
        self.settle(result)
    }

    fn create_fragment(
        &self,
        home: NodeId,
        options: &CreateOptions,
    ) -> Result<NodeKey, CreateError> {
        let home_path = self.node_path(home)?;
        let parent = self.layout.absolute(&home_path);

        let mut index = read_index(&parent)?;
        let ordering = index.next_ordering();
        let name = self.fragment_name();
        let title = title_or(options, || format!("New Fragment ({ordering})"));

        index.insert(name.clone(), Entry::new(title, ordering));
        write_index(&parent, &index)?;
        create_file(&parent.join(&name))?;

        tracing::info!("Created fragment {name} in {}", home_path.display());
        Ok(NodeKey::new(home_path, name))
    }

    fn node_path(&self, id: NodeId) -> Result<PathBuf, PlacementError> {
        self.state
            .outline
            .get(id)
            .map(|node| node.ids.path())
            .ok_or(PlacementError::UnknownNode(id))
    }

    /// Sets the title of a chapter, snip or fragment.
    ///
    /// A node with no sidecar entry is indexed at the end of its siblings.
    ///
    /// # Errors
    ///
    /// Returns an error for roots and containers, or if the sidecar cannot be
    /// updated.
    #[instrument(skip(self))]
    pub fn rename(&mut self, id: NodeId, title: NonEmptyString) -> Result<(), RenameError> {
        let node = self.node(id).ok_or(RenameError::UnknownNode(id))?;
        let resource_type = node.resource_type();
        if !resource_type.is_indexed() {
            return Err(RenameError::NotRenamable(resource_type));
        }
        let dir = self.layout.absolute(&node.ids.relative_path);
        let name = node.ids.file_name.clone();

        let result = write_title(&dir, &name, &title).map_err(RenameError::from);
        if result.is_ok() {
            tracing::info!("Renamed {name} to '{title}'");
        }
        self.settle(result)
    }

    /// Moves `mover` onto `target`, a sibling in the same directory.
    ///
    /// The mover takes the target's ordering and every sibling in between
    /// shifts one slot toward the mover's old position.
    ///
    /// # Errors
    ///
    /// Returns an error if the nodes are not indexed siblings, or if the
    /// sidecar cannot be updated.
    #[instrument(skip(self))]
    pub fn reorder(&mut self, mover: NodeId, target: NodeId) -> Result<ReorderOutcome, ReorderError> {
        let mover_node = self.node(mover).ok_or(ReorderError::UnknownNode(mover))?;
        let target_node = self.node(target).ok_or(ReorderError::UnknownNode(target))?;
        for node in [mover_node, target_node] {
            if !node.resource_type().is_indexed() {
                return Err(ReorderError::NotOrderable(node.resource_type()));
            }
        }
        if mover_node.ids.relative_path != target_node.ids.relative_path {
            return Err(ReorderError::NotSiblings {
                mover: mover_node.key(),
                target: target_node.key(),
            });
        }
        if mover == target {
            return Ok(ReorderOutcome::Unchanged);
        }

        let dir = self.layout.absolute(&mover_node.ids.relative_path);
        let mover_name = mover_node.ids.file_name.clone();
        let target_name = target_node.ids.file_name.clone();

        let result = match ordering::reorder_entries(&dir, &mover_name, &target_name) {
            Ok(true) => {
                tracing::info!("Reordered {mover_name} onto {target_name}");
                Ok(ReorderOutcome::Reordered)
            }
            Ok(false) => Err(ReorderError::MissingEntry {
                path: sidecar_path(&dir),
            }),
            Err(e) => Err(e.into()),
        };
        self.settle(result)
    }

    /// Swaps a node with its previous or next indexed sibling.
    ///
    /// # Errors
    ///
    /// See [`Project::reorder`].
    pub fn nudge(&mut self, id: NodeId, direction: Direction) -> Result<ReorderOutcome, ReorderError> {
        let outline = &self.state.outline;
        let node = outline.get(id).ok_or(ReorderError::UnknownNode(id))?;
        let parent = node
            .ids
            .parent_internal_id
            .ok_or(ReorderError::NotOrderable(node.resource_type()))?;

        let siblings: Vec<NodeId> = outline
            .children(parent)
            .into_iter()
            .filter(|sibling| {
                sibling.resource_type().is_indexed()
                    && sibling.ids.relative_path == node.ids.relative_path
            })
            .map(Node::id)
            .collect();
        let Some(position) = siblings.iter().position(|&sibling| sibling == id) else {
            return Err(ReorderError::NotOrderable(node.resource_type()));
        };

        let neighbour = match direction {
            Direction::Up => position.checked_sub(1).map(|p| siblings[p]),
            Direction::Down => siblings.get(position + 1).copied(),
        };
        match neighbour {
            Some(target) => self.reorder(id, target),
            None => Ok(ReorderOutcome::Unchanged),
        }
    }
}

fn write_title(dir: &Path, name: &str, title: &NonEmptyString) -> Result<(), SidecarError> {
    let mut index = read_index(dir)?;
    let ordering = index
        .get(name)
        .map_or_else(|| index.next_ordering(), |entry| entry.ordering);
    index.insert(name, Entry::new(title.to_string(), ordering));
    write_index(dir, &index)
}

fn title_or(options: &CreateOptions, default: impl FnOnce() -> String) -> String {
    options
        .title
        .as_ref()
        .map_or_else(default, ToString::to_string)
}

fn create_dir(path: &Path) -> Result<(), CreateError> {
    fs::create_dir(path).map_err(|source| CreateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create_file(path: &Path) -> Result<(), CreateError> {
    fs::File::create_new(path)
        .map(drop)
        .map_err(|source| CreateError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Errors creating the project skeleton.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// A directory could not be created.
    #[error("failed to create {path}: {source}")]
    Io {
        /// The directory.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// An initial sidecar could not be written.
    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    /// The configuration file could not be written.
    #[error("{0}")]
    Config(String),
}

/// Errors opening a project.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The configuration file exists but is invalid.
    #[error("invalid configuration {path}: {reason}")]
    Config {
        /// The configuration path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The outline could not be built.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The journal could not be read.
    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Errors creating a chapter, snip or fragment.
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    /// The target cannot hold the new node.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// A sidecar could not be updated.
    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    /// A file or directory could not be created.
    #[error("failed to create {path}: {source}")]
    Io {
        /// The path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The outline could not be rebuilt afterwards.
    #[error("created, but the outline could not be rebuilt: {0}")]
    Rebuild(#[from] ScanError),
}

/// Errors setting a title.
#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    /// The id does not belong to the current outline.
    #[error("node {0} is not part of the current outline")]
    UnknownNode(NodeId),

    /// Only chapters, snips and fragments have titles of their own.
    #[error("a {0} cannot be renamed")]
    NotRenamable(ResourceType),

    /// The sidecar could not be updated.
    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    /// The outline could not be rebuilt afterwards.
    #[error("renamed, but the outline could not be rebuilt: {0}")]
    Rebuild(#[from] ScanError),
}

/// Errors reordering siblings.
#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    /// The id does not belong to the current outline.
    #[error("node {0} is not part of the current outline")]
    UnknownNode(NodeId),

    /// Only chapters, snips and fragments have an ordering.
    #[error("a {0} cannot be reordered")]
    NotOrderable(ResourceType),

    /// Reordering only works within one directory. Use a move instead.
    #[error("{mover} and {target} are not in the same container")]
    NotSiblings {
        /// The mover's key.
        mover: NodeKey,
        /// The target's key.
        target: NodeKey,
    },

    /// One of the nodes has no sidecar entry.
    #[error("sidecar {path} is missing an entry; reload to heal it")]
    MissingEntry {
        /// The sidecar path.
        path: PathBuf,
    },

    /// The sidecar could not be updated.
    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    /// The outline could not be rebuilt afterwards.
    #[error("reordered, but the outline could not be rebuilt: {0}")]
    Rebuild(#[from] ScanError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixture::Fixture;

    fn titled(title: &str) -> CreateOptions {
        CreateOptions {
            title: Some(NonEmptyString::new(title.to_string()).unwrap()),
            skip_fragment: false,
        }
    }

    fn titles(project: &Project<Loaded>, parent: NodeId) -> Vec<String> {
        project
            .outline()
            .children(parent)
            .iter()
            .map(|node| node.ids.display.clone())
            .collect()
    }

    #[test]
    fn init_creates_a_loadable_skeleton() {
        let tmp = tempfile::tempdir().unwrap();
        let project = Project::new(tmp.path().to_path_buf());
        project.init().unwrap();
        project.init().unwrap();

        assert!(tmp.path().join("data/recycling").is_dir());
        assert!(tmp.path().join("data/chapters/.config").is_file());
        assert!(tmp.path().join(".wt/config.toml").is_file());

        let loaded = project.load().unwrap();
        assert_eq!(loaded.outline().len(), 3);
        assert!(loaded.interrupted().is_empty());
    }

    #[test]
    fn invalid_config_fails_to_load() {
        let fx = Fixture::new();
        fs::write(fx.root().join(".wt/config.toml"), "_version = \"1\"\npreview_bytes = -3\n")
            .unwrap();

        let err = Project::new(fx.root().to_path_buf()).load().unwrap_err();

        assert!(matches!(err, LoadError::Config { .. }));
    }

    #[test]
    fn new_chapter_gets_snips_and_an_initial_fragment() {
        let fx = Fixture::new();
        let mut project = fx.project();

        let key = project.new_chapter(CreateOptions::default()).unwrap();

        assert!(key.file_name.starts_with("chapter-"));
        let id = project.resolve(&key.path()).unwrap();
        let chapter = project.node(id).unwrap();
        assert_eq!(chapter.ids.display, "New Chapter (0)");

        let children = project.outline().children(id);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].resource_type(), ResourceType::Fragment);
        assert_eq!(children[0].ids.display, "New Fragment");
        assert_eq!(children[0].ids.ordering, 0);
        assert_eq!(children[1].resource_type(), ResourceType::Container);
        assert!(fx.root().join(&key.path()).join("snips/.config").is_file());
    }

    #[test]
    fn new_chapters_append_at_the_end() {
        let fx = Fixture::new();
        fx.chapter("existing", "Existing", 6);
        let mut project = fx.project();

        project.new_chapter(titled("Later")).unwrap();

        let chapters = project.outline().chapters();
        assert_eq!(titles(&project, chapters), ["Existing", "Later"]);
        let sidecar = fx.sidecar(Path::new("data/chapters"));
        assert!(sidecar.children().any(|(_, e)| e.title == "Later" && e.ordering == 7));
    }

    #[test]
    fn new_chapter_can_skip_the_fragment() {
        let fx = Fixture::new();
        let mut project = fx.project();

        let key = project
            .new_chapter(CreateOptions {
                title: None,
                skip_fragment: true,
            })
            .unwrap();

        let id = project.resolve(&key.path()).unwrap();
        assert_eq!(project.outline().children(id).len(), 1);
    }

    #[test]
    fn new_snip_on_a_chapter_lands_in_its_snips_directory() {
        let fx = Fixture::new();
        let ch = fx.chapter("ch", "Chapter", 0);
        let mut project = fx.project();
        let chapter = project.resolve(&ch).unwrap();

        let key = project.new_snip(chapter, CreateOptions::default()).unwrap();

        assert_eq!(key.relative_path, ch.join("snips"));
        let snip = project.resolve(&key.path()).unwrap();
        assert_eq!(project.node(snip).unwrap().ids.display, "New Snip (0)");
        assert_eq!(titles(&project, snip), ["New Fragment (0)"]);
    }

    #[test]
    fn new_snip_on_a_snip_nests_it() {
        let fx = Fixture::new();
        let s = fx.snip(Path::new("data/snips"), "outer", "Outer", 0);
        fx.fragment(&s, "f.wt", "F", 0, "");
        let mut project = fx.project();
        let outer = project.resolve(&s).unwrap();

        let key = project.new_snip(outer, titled("Inner")).unwrap();

        assert_eq!(key.relative_path, s);
        let outer = project.resolve(&s).unwrap();
        assert_eq!(titles(&project, outer), ["F", "Inner"]);
    }

    #[test]
    fn new_snip_in_the_chapters_container_is_rejected() {
        let fx = Fixture::new();
        let mut project = fx.project();
        let chapters = project.outline().chapters();

        let err = project
            .new_snip(chapters, CreateOptions::default())
            .unwrap_err();

        assert!(matches!(err, CreateError::Placement(_)));
    }

    #[test]
    fn new_fragment_beside_a_fragment() {
        let fx = Fixture::new();
        let ch = fx.chapter("ch", "Chapter", 0);
        fx.fragment(&ch, "a.wt", "A", 0, "");
        fx.fragment(&ch, "b.wt", "B", 3, "");
        let mut project = fx.project();
        let a = project.resolve(&ch.join("a.wt")).unwrap();

        let key = project.new_fragment(a, CreateOptions::default()).unwrap();

        assert_eq!(key.relative_path, ch);
        assert!(key.file_name.ends_with(".wt"));
        let chapter = project.resolve(&ch).unwrap();
        assert_eq!(titles(&project, chapter), ["A", "B", "New Fragment (4)", "Snips"]);
        assert!(fx.root().join(key.path()).is_file());
    }

    #[test]
    fn new_fragment_on_root_is_rejected() {
        let fx = Fixture::new();
        let mut project = fx.project();
        let root = project.outline().root();

        assert!(project.new_fragment(root, CreateOptions::default()).is_err());
    }

    #[test]
    fn rename_updates_the_sidecar_title_only() {
        let fx = Fixture::new();
        let ch = fx.chapter("ch", "Chapter", 0);
        fx.fragment(&ch, "a.wt", "A", 2, "body");
        let mut project = fx.project();
        let a = project.resolve(&ch.join("a.wt")).unwrap();

        project
            .rename(a, NonEmptyString::new("Opening".to_string()).unwrap())
            .unwrap();

        assert_eq!(fx.sidecar(&ch).get("a.wt"), Some(&Entry::new("Opening", 2)));
        let a = project.resolve(&ch.join("a.wt")).unwrap();
        assert_eq!(project.node(a).unwrap().ids.display, "Opening");
    }

    #[test]
    fn containers_cannot_be_renamed() {
        let fx = Fixture::new();
        let mut project = fx.project();
        let snips = project.outline().snips();

        let err = project
            .rename(snips, NonEmptyString::new("Other".to_string()).unwrap())
            .unwrap_err();

        assert!(matches!(err, RenameError::NotRenamable(ResourceType::Container)));
    }

    #[test]
    fn reorder_moves_onto_a_sibling() {
        let fx = Fixture::new();
        fx.chapter("a", "A", 0);
        fx.chapter("b", "B", 1);
        fx.chapter("c", "C", 2);
        let mut project = fx.project();
        let c = project.resolve(Path::new("data/chapters/c")).unwrap();
        let a = project.resolve(Path::new("data/chapters/a")).unwrap();

        let outcome = project.reorder(c, a).unwrap();

        assert_eq!(outcome, ReorderOutcome::Reordered);
        let chapters = project.outline().chapters();
        assert_eq!(titles(&project, chapters), ["C", "A", "B"]);
        let mut orderings: Vec<_> = fx
            .sidecar(Path::new("data/chapters"))
            .children()
            .map(|(_, e)| e.ordering)
            .collect();
        orderings.sort_unstable();
        assert_eq!(orderings, [0, 1, 2]);
    }

    #[test]
    fn reorder_across_containers_is_rejected() {
        let fx = Fixture::new();
        let ch = fx.chapter("ch", "Chapter", 0);
        fx.fragment(&ch, "a.wt", "A", 0, "");
        let s = fx.snip(Path::new("data/snips"), "s", "S", 0);
        fx.fragment(&s, "b.wt", "B", 0, "");
        let mut project = fx.project();
        let a = project.resolve(&ch.join("a.wt")).unwrap();
        let b = project.resolve(&s.join("b.wt")).unwrap();

        assert!(matches!(
            project.reorder(a, b).unwrap_err(),
            ReorderError::NotSiblings { .. }
        ));
    }

    #[test]
    fn nudge_swaps_with_neighbours() {
        let fx = Fixture::new();
        let ch = fx.chapter("ch", "Chapter", 0);
        fx.fragment(&ch, "a.wt", "A", 0, "");
        fx.fragment(&ch, "b.wt", "B", 1, "");
        let mut project = fx.project();

        let b = project.resolve(&ch.join("b.wt")).unwrap();
        assert_eq!(
            project.nudge(b, Direction::Up).unwrap(),
            ReorderOutcome::Reordered
        );
        let chapter = project.resolve(&ch).unwrap();
        assert_eq!(titles(&project, chapter), ["B", "A", "Snips"]);

        let b = project.resolve(&ch.join("b.wt")).unwrap();
        assert_eq!(
            project.nudge(b, Direction::Up).unwrap(),
            ReorderOutcome::Unchanged
        );
    }

    #[test]
    fn clearing_the_journal_forgets_interrupted_operations() {
        let fx = Fixture::new();
        let mut project = fx.project();
        project
            .journal()
            .begin(
                crate::storage::journal::Operation::Move,
                Path::new("data/chapters/a"),
                None,
            )
            .unwrap();
        project.reload().unwrap();
        assert_eq!(project.interrupted().len(), 1);

        assert_eq!(project.clear_journal().unwrap(), 1);

        assert!(project.interrupted().is_empty());
        assert!(project.journal().entries().unwrap().is_empty());
    }

    #[test]
    fn mutations_invalidate_old_ids() {
        let fx = Fixture::new();
        let mut project = fx.project();
        let old_root = project.outline().root();

        project.new_chapter(CreateOptions::default()).unwrap();

        assert!(project.node(old_root).is_none());
        assert!(project.node(project.outline().root()).is_some());
    }
}
