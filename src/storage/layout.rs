//! The on-disk layout of a project.
//!
//! ```text
//! <root>/.wt/config.toml
//! <root>/data/.journal
//! <root>/data/chapters/.config
//! <root>/data/chapters/<chapter>/{.config, *.wt, snips/}
//! <root>/data/snips/.config
//! <root>/data/snips/<snip>/{.config, *.wt, <nested snip>/}
//! <root>/data/recycling/{.log, <recycle bin name>}
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::domain::ResourceType;

/// The directory holding all project data.
pub const DATA_DIR: &str = "data";
/// The chapters directory, under [`DATA_DIR`].
pub const CHAPTERS_DIR: &str = "chapters";
/// The top-level snips directory, under [`DATA_DIR`]. Also the name of each
/// chapter's snips directory.
pub const SNIPS_DIR: &str = "snips";
/// The recycle bin, under [`DATA_DIR`].
pub const RECYCLING_DIR: &str = "recycling";
/// The recycle log, inside [`RECYCLING_DIR`].
pub const RECYCLE_LOG: &str = ".log";
/// The operation journal, under [`DATA_DIR`].
pub const JOURNAL_FILE: &str = ".journal";
/// The sidecar index file present in every indexed directory.
pub const SIDECAR_FILE: &str = ".config";
/// The configuration directory.
pub const CONFIG_DIR: &str = ".wt";
/// The configuration file, inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Absolute paths of the well-known locations in a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Creates a layout rooted at `root`.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `data/`
    #[must_use]
    pub fn data(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// `data/chapters/`
    #[must_use]
    pub fn chapters(&self) -> PathBuf {
        self.data().join(CHAPTERS_DIR)
    }

    /// `data/snips/`
    #[must_use]
    pub fn snips(&self) -> PathBuf {
        self.data().join(SNIPS_DIR)
    }

    /// `data/recycling/`
    #[must_use]
    pub fn recycling(&self) -> PathBuf {
        self.data().join(RECYCLING_DIR)
    }

    /// `data/recycling/.log`
    #[must_use]
    pub fn recycle_log(&self) -> PathBuf {
        self.recycling().join(RECYCLE_LOG)
    }

    /// `data/.journal`
    #[must_use]
    pub fn journal(&self) -> PathBuf {
        self.data().join(JOURNAL_FILE)
    }

    /// `.wt/config.toml`
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Joins a project-relative path onto the root.
    #[must_use]
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Strips the root from an absolute path.
    ///
    /// Relative paths are returned with any leading `./` removed.
    #[must_use]
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            path.strip_prefix(&self.root).ok().map(Path::to_path_buf)
        } else {
            Some(path.strip_prefix(".").unwrap_or(path).to_path_buf())
        }
    }
}

/// Generates a collision-resistant name: `<prefix>-<millis>-<uuid>`, with an
/// optional extension.
#[must_use]
pub fn generated_name(prefix: &str, extension: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let uuid = Uuid::new_v4();
    extension.map_or_else(
        || format!("{prefix}-{millis}-{uuid}"),
        |extension| format!("{prefix}-{millis}-{uuid}.{extension}"),
    )
}

/// The name a node of the given type is given in the recycle bin.
#[must_use]
pub fn recycle_bin_name(resource_type: ResourceType) -> String {
    generated_name(&format!("deleted-{resource_type}"), None)
}

/// Writes `contents` to `path` without ever leaving a partial file behind.
///
/// The bytes go to a temporary sibling first, which is then renamed over the
/// target.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp-{}", Uuid::new_v4()));

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_are_unique_and_prefixed() {
        let a = generated_name("fragment", Some("wt"));
        let b = generated_name("fragment", Some("wt"));
        assert_ne!(a, b);
        assert!(a.starts_with("fragment-"));
        assert!(a.ends_with(".wt"));
    }

    #[test]
    fn recycle_bin_names_carry_the_type() {
        let name = recycle_bin_name(ResourceType::Chapter);
        assert!(name.starts_with("deleted-chapter-"));
    }

    #[test]
    fn relative_strips_root_and_dot() {
        let layout = Layout::new(PathBuf::from("/projects/novel"));
        assert_eq!(
            layout.relative(Path::new("/projects/novel/data/chapters")),
            Some(PathBuf::from("data/chapters"))
        );
        assert_eq!(
            layout.relative(Path::new("./data/snips")),
            Some(PathBuf::from("data/snips"))
        );
        assert_eq!(layout.relative(Path::new("/elsewhere/data")), None);
    }

    #[test]
    fn atomic_write_leaves_no_temporary_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".config");

        write_atomically(&path, b"{}").unwrap();
        write_atomically(&path, b"{\"a\":1}").unwrap();

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, [".config"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":1}");
    }
}
