//! Throwaway projects for tests.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use walkdir::WalkDir;

use super::{
    project::{Loaded, Project},
    sidecar::{Entry, Sidecar, read_index, write_index},
};

/// An initialized project in a temporary directory. Paths taken and returned
/// by the helpers are project-relative.
pub struct Fixture {
    tmp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        Project::new(tmp.path().to_path_buf())
            .init()
            .expect("failed to initialize project");
        Self { tmp }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn project(&self) -> Project<Loaded> {
        Project::new(self.root().to_path_buf())
            .load()
            .expect("failed to load project")
    }

    pub fn sidecar(&self, dir: &Path) -> Sidecar {
        read_index(&self.root().join(dir)).expect("failed to read sidecar")
    }

    pub fn index(&self, dir: &Path, name: &str, title: &str, ordering: i64) {
        let mut sidecar = self.sidecar(dir);
        sidecar.insert(name, Entry::new(title, ordering));
        write_index(&self.root().join(dir), &sidecar).expect("failed to write sidecar");
    }

    pub fn chapter(&self, name: &str, title: &str, ordering: i64) -> PathBuf {
        let parent = Path::new("data/chapters");
        let dir = parent.join(name);
        fs::create_dir(self.root().join(&dir)).expect("failed to create chapter");
        self.index(parent, name, title, ordering);
        dir
    }

    pub fn chapter_snips(&self, chapter: &Path) -> PathBuf {
        let dir = chapter.join("snips");
        fs::create_dir_all(self.root().join(&dir)).expect("failed to create snips");
        write_index(&self.root().join(&dir), &Sidecar::default())
            .expect("failed to write sidecar");
        dir
    }

    pub fn snip(&self, parent: &Path, name: &str, title: &str, ordering: i64) -> PathBuf {
        let dir = parent.join(name);
        fs::create_dir(self.root().join(&dir)).expect("failed to create snip");
        self.index(parent, name, title, ordering);
        dir
    }

    pub fn fragment(
        &self,
        dir: &Path,
        name: &str,
        title: &str,
        ordering: i64,
        text: &str,
    ) -> PathBuf {
        let path = dir.join(name);
        fs::write(self.root().join(&path), text).expect("failed to write fragment");
        self.index(dir, name, title, ordering);
        path
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.root().join(path).exists()
    }

    /// Every path under the root with the contents of each file, for
    /// asserting that nothing on disk changed.
    pub fn snapshot(&self) -> Vec<(PathBuf, Option<String>)> {
        WalkDir::new(self.root())
            .sort_by_file_name()
            .into_iter()
            .map(|entry| {
                let entry = entry.expect("failed to walk project");
                let relative = entry
                    .path()
                    .strip_prefix(self.root())
                    .expect("walked outside root")
                    .to_path_buf();
                let contents = entry
                    .file_type()
                    .is_file()
                    .then(|| fs::read_to_string(entry.path()).expect("failed to read file"));
                (relative, contents)
            })
            .collect()
    }

    /// Names in the recycle bin, excluding the log.
    pub fn recycled(&self) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(self.root().join("data/recycling"))
            .expect("failed to read recycling")
            .map(|entry| {
                entry
                    .expect("failed to read entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .filter(|name| name != ".log")
            .collect();
        names.sort();
        names
    }
}
