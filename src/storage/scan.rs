//! Builds an [`Outline`] from the directories and sidecars under `data/`.
//!
//! The scan is an explicit worklist rather than recursion. Symbolic links to
//! directories are never followed, so cycles on disk cannot trap it.

use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};

use tracing::instrument;
use walkdir::WalkDir;

use super::{
    layout::{CHAPTERS_DIR, DATA_DIR, Layout, SNIPS_DIR},
    sidecar::{Entry, Sidecar, SidecarError, read_index, write_index},
};
use crate::domain::{
    Config, NodeId, NodeKey, NodeKind, Outline, ResourceType, outline::OutlineBuilder,
};

/// Title of the synthetic root node.
pub const ROOT_TITLE: &str = "root";
/// Title of the chapters container.
pub const CHAPTERS_TITLE: &str = "Chapters";
/// Title of the top-level snips container.
pub const WORK_SNIPS_TITLE: &str = "Work Snips";
/// Title of a chapter's snips container.
pub const CHAPTER_SNIPS_TITLE: &str = "Snips";
/// A chapter's snips container sorts after its fragments.
pub const CHAPTER_SNIPS_ORDERING: i64 = 1_000_000;

/// Errors that abort a scan. No partial outline is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// `data/chapters` or `data/snips` does not exist.
    #[error("required directory {0} is missing (is this a project root?)")]
    MissingDirectory(PathBuf),

    /// A directory could not be listed.
    #[error("failed to read directory {path}: {source}")]
    ReadDirectory {
        /// The directory being listed.
        path: PathBuf,
        /// The underlying error.
        source: walkdir::Error,
    },

    /// A sidecar could not be read, parsed or healed.
    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    /// A missing directory could not be created while healing.
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        /// The directory being created.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// A fragment could not be read for its preview.
    #[error("failed to read fragment {path}: {source}")]
    ReadFragment {
        /// The fragment path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

/// Scans the project at `root` and returns its outline.
///
/// Children missing from their sidecar are indexed as they are found. With
/// [`Config::heal_sidecars`] set the new entries are written back.
///
/// # Errors
///
/// Returns an error if a required directory is missing, or if any directory,
/// sidecar or fragment cannot be read.
#[instrument(skip(config))]
pub fn initialize_tree(root: &Path, config: &Config) -> Result<Outline, ScanError> {
    let layout = Layout::new(root.to_path_buf());
    for required in [layout.chapters(), layout.snips()] {
        if !required.is_dir() {
            return Err(ScanError::MissingDirectory(required));
        }
    }

    let outline = Scanner::new(root, config).run()?;
    tracing::debug!(
        nodes = outline.len(),
        generation = outline.generation(),
        "Initialized outline"
    );
    Ok(outline)
}

/// A directory still to be scanned. Paths are project-relative.
enum Task {
    /// A container whose subdirectories are all chapters or all snips.
    Group {
        container: NodeId,
        dir: PathBuf,
        member: ResourceType,
    },
    Chapter {
        id: NodeId,
        dir: PathBuf,
    },
    Snip {
        id: NodeId,
        dir: PathBuf,
    },
}

struct Scanner<'a> {
    root: &'a Path,
    config: &'a Config,
    builder: OutlineBuilder,
    tasks: Vec<Task>,
}

/// The visible children of a directory, in file-name order.
#[derive(Default)]
struct Listing {
    directories: Vec<String>,
    files: Vec<String>,
}

/// A sidecar being consulted for one directory, tracking whether it needs
/// writing back.
struct Index {
    dir: PathBuf,
    sidecar: Sidecar,
    dirty: bool,
    seen: Vec<String>,
}

const fn placeholder() -> NodeKind {
    NodeKind::Container {
        contents: Vec::new(),
    }
}

impl<'a> Scanner<'a> {
    fn new(root: &'a Path, config: &'a Config) -> Self {
        Self {
            root,
            config,
            builder: OutlineBuilder::new(),
            tasks: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Outline, ScanError> {
        let data = PathBuf::from(DATA_DIR);
        let root = self.builder.insert(
            None,
            NodeKey::new(DATA_DIR, ""),
            ROOT_TITLE.to_string(),
            0,
            placeholder(),
        );
        let chapters = self.builder.insert(
            Some((root, ResourceType::Root)),
            NodeKey::new(DATA_DIR, CHAPTERS_DIR),
            CHAPTERS_TITLE.to_string(),
            0,
            placeholder(),
        );
        let snips = self.builder.insert(
            Some((root, ResourceType::Root)),
            NodeKey::new(DATA_DIR, SNIPS_DIR),
            WORK_SNIPS_TITLE.to_string(),
            1,
            placeholder(),
        );
        self.builder.set_kind(root, NodeKind::Root { chapters, snips });

        self.tasks.push(Task::Group {
            container: snips,
            dir: data.join(SNIPS_DIR),
            member: ResourceType::Snip,
        });
        self.tasks.push(Task::Group {
            container: chapters,
            dir: data.join(CHAPTERS_DIR),
            member: ResourceType::Chapter,
        });

        while let Some(task) = self.tasks.pop() {
            match task {
                Task::Group {
                    container,
                    dir,
                    member,
                } => self.group(container, dir, member)?,
                Task::Chapter { id, dir } => self.chapter(id, dir)?,
                Task::Snip { id, dir } => self.snip(id, dir)?,
            }
        }

        Ok(self.builder.finish(root))
    }

    fn group(
        &mut self,
        container: NodeId,
        dir: PathBuf,
        member: ResourceType,
    ) -> Result<(), ScanError> {
        let listing = list(&self.root.join(&dir))?;
        let mut index = self.open_index(&dir)?;

        for file in &listing.files {
            tracing::debug!("Ignoring stray file {} in {}", file, dir.display());
        }

        let contents = self.directories(
            &mut index,
            &listing.directories,
            (container, ResourceType::Container),
            member,
        );
        self.close_index(index)?;
        self.builder
            .set_kind(container, NodeKind::Container { contents });
        Ok(())
    }

    fn chapter(&mut self, id: NodeId, dir: PathBuf) -> Result<(), ScanError> {
        let listing = list(&self.root.join(&dir))?;
        let mut index = self.open_index(&dir)?;

        let text_data = self.fragments(&mut index, &listing.files, (id, ResourceType::Chapter))?;
        self.close_index(index)?;

        let snips = self.builder.insert(
            Some((id, ResourceType::Chapter)),
            NodeKey::new(dir.clone(), SNIPS_DIR),
            CHAPTER_SNIPS_TITLE.to_string(),
            CHAPTER_SNIPS_ORDERING,
            placeholder(),
        );
        let mut has_snips = false;
        for name in &listing.directories {
            if name == SNIPS_DIR {
                has_snips = true;
            } else {
                tracing::debug!("Ignoring directory {} in chapter {}", name, dir.display());
            }
        }
        if !has_snips && self.config.heal_sidecars {
            self.create_snips(&dir.join(SNIPS_DIR))?;
            has_snips = true;
        }
        if has_snips {
            self.tasks.push(Task::Group {
                container: snips,
                dir: dir.join(SNIPS_DIR),
                member: ResourceType::Snip,
            });
        }

        self.builder
            .set_kind(id, NodeKind::Chapter { text_data, snips });
        Ok(())
    }

    fn snip(&mut self, id: NodeId, dir: PathBuf) -> Result<(), ScanError> {
        let listing = list(&self.root.join(&dir))?;
        let mut index = self.open_index(&dir)?;

        let text_data = self.fragments(&mut index, &listing.files, (id, ResourceType::Snip))?;
        let snips = self.directories(
            &mut index,
            &listing.directories,
            (id, ResourceType::Snip),
            ResourceType::Snip,
        );
        self.close_index(index)?;

        self.builder
            .set_kind(id, NodeKind::Snip { text_data, snips });
        Ok(())
    }

    /// Inserts one chapter or snip per directory and queues it for scanning.
    fn directories(
        &mut self,
        index: &mut Index,
        names: &[String],
        parent: (NodeId, ResourceType),
        member: ResourceType,
    ) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let entry = self.entry(index, name, true);
            let id = self.builder.insert(
                Some(parent),
                NodeKey::new(index.dir.clone(), name.clone()),
                entry.title,
                entry.ordering,
                placeholder(),
            );
            let dir = index.dir.join(name);
            self.tasks.push(if member == ResourceType::Chapter {
                Task::Chapter { id, dir }
            } else {
                Task::Snip { id, dir }
            });
            ids.push(id);
        }
        ids
    }

    /// Inserts one fragment per file carrying the fragment extension.
    fn fragments(
        &mut self,
        index: &mut Index,
        files: &[String],
        parent: (NodeId, ResourceType),
    ) -> Result<Vec<NodeId>, ScanError> {
        let config = self.config;
        let extension = config.fragment_extension();
        let mut ids = Vec::new();
        for name in files {
            if !Path::new(name)
                .extension()
                .is_some_and(|found| found == extension)
            {
                tracing::debug!("Ignoring non-fragment file {} in {}", name, index.dir.display());
                continue;
            }
            let entry = self.entry(index, name, false);
            let path = self.root.join(&index.dir).join(name);
            let preview = read_preview(&path, config.preview_bytes())?;
            ids.push(self.builder.insert(
                Some(parent),
                NodeKey::new(index.dir.clone(), name.clone()),
                entry.title,
                entry.ordering,
                NodeKind::Fragment { preview },
            ));
        }
        Ok(ids)
    }

    /// Creates a chapter's missing `snips` directory with an empty sidecar.
    fn create_snips(&self, dir: &Path) -> Result<(), ScanError> {
        let path = self.root.join(dir);
        fs::create_dir(&path).map_err(|source| ScanError::CreateDirectory {
            path: path.clone(),
            source,
        })?;
        write_index(&path, &Sidecar::default())?;
        tracing::info!("Created missing snips directory {}", dir.display());
        Ok(())
    }

    fn open_index(&self, dir: &Path) -> Result<Index, ScanError> {
        Ok(Index {
            dir: dir.to_path_buf(),
            sidecar: read_index(&self.root.join(dir))?,
            dirty: false,
            seen: Vec::new(),
        })
    }

    fn close_index(&self, index: Index) -> Result<(), ScanError> {
        for (name, _) in index.sidecar.children() {
            if !index.seen.iter().any(|seen| seen == name) {
                tracing::debug!(
                    "Sidecar in {} lists '{}' which is not on disk",
                    index.dir.display(),
                    name
                );
            }
        }
        if index.dirty {
            write_index(&self.root.join(&index.dir), &index.sidecar)?;
            tracing::info!("Healed sidecar in {}", index.dir.display());
        }
        Ok(())
    }

    /// The sidecar entry of a child, synthesizing one if it is missing.
    fn entry(&self, index: &mut Index, name: &str, is_directory: bool) -> Entry {
        index.seen.push(name.to_string());
        if let Some(entry) = index.sidecar.get(name) {
            return entry.clone();
        }

        if self.config.heal_sidecars {
            let entry = Entry::new(name, index.sidecar.next_ordering());
            tracing::debug!(
                "Indexing newly discovered '{}' in {} at {}",
                name,
                index.dir.display(),
                entry.ordering
            );
            index.sidecar.insert(name, entry.clone());
            index.dirty = true;
            entry
        } else if is_directory {
            Entry::new(name, self.config.default_ordering())
        } else {
            let entry = Entry::new(name, index.sidecar.next_ordering());
            index.sidecar.insert(name, entry.clone());
            entry
        }
    }
}

/// Lists the visible children of `dir` without following symbolic links to
/// directories.
fn list(dir: &Path) -> Result<Listing, ScanError> {
    let mut listing = Listing::default();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|source| ScanError::ReadDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
        let Some(name) = entry.file_name().to_str() else {
            tracing::warn!("Skipping non UTF-8 name {}", entry.path().display());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            listing.directories.push(name.to_string());
        } else if file_type.is_symlink() {
            if entry.path().is_dir() {
                tracing::warn!(
                    "Not following symbolic link to directory {}",
                    entry.path().display()
                );
            } else if entry.path().is_file() {
                listing.files.push(name.to_string());
            }
        } else if file_type.is_file() {
            listing.files.push(name.to_string());
        }
    }

    Ok(listing)
}

/// Reads up to `limit` bytes of a fragment as text.
///
/// A multi-byte character cut off by the limit is dropped.
fn read_preview(path: &Path, limit: usize) -> Result<String, ScanError> {
    let read_error = |source| ScanError::ReadFragment {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_error)?;
    let mut bytes = Vec::with_capacity(limit);
    file.take(u64::try_from(limit).unwrap_or(u64::MAX))
        .read_to_end(&mut bytes)
        .map_err(read_error)?;

    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) if e.utf8_error().error_len().is_none() => {
            let valid = e.utf8_error().valid_up_to();
            String::from_utf8_lossy(&e.into_bytes()[..valid]).into_owned()
        }
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
