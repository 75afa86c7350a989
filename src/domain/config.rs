use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for a writing project.
///
/// Stored as TOML in `.wt/config.toml` under the project root. Every field
/// has a default, so a missing file behaves like an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// How many bytes of each fragment are cached as its preview.
    preview_bytes: usize,

    /// The ordering given to a chapter or snip directory that has no sidecar
    /// entry, when sidecar healing is disabled.
    default_ordering: i64,

    /// Whether sidecar entries discovered missing during a scan are written
    /// back to disk.
    ///
    /// When `true` (default): the entry is appended at `max + 1` and the
    /// sidecar is rewritten.
    ///
    /// When `false`: directories get [`Self::default_ordering`], fragments are
    /// appended at `max + 1` in memory only, and nothing is written.
    pub heal_sidecars: bool,

    /// The extension (without the dot) that marks a file as a fragment.
    fragment_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preview_bytes: default_preview_bytes(),
            default_ordering: default_ordering(),
            heal_sidecars: true,
            fragment_extension: default_fragment_extension(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// The parent directory is created if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {e}"))?;
        }
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the preview length in bytes.
    #[must_use]
    pub const fn preview_bytes(&self) -> usize {
        self.preview_bytes
    }

    /// Returns the fallback ordering for unindexed directories.
    #[must_use]
    pub const fn default_ordering(&self) -> i64 {
        self.default_ordering
    }

    /// Returns the fragment file extension, without the dot.
    #[must_use]
    pub fn fragment_extension(&self) -> &str {
        &self.fragment_extension
    }

    /// Sets the preview length in bytes.
    pub const fn set_preview_bytes(&mut self, value: usize) {
        self.preview_bytes = value;
    }

    /// Sets the fallback ordering for unindexed directories.
    pub const fn set_default_ordering(&mut self, value: i64) {
        self.default_ordering = value;
    }

    /// Sets the fragment file extension.
    ///
    /// A leading dot is stripped. Returns `false` and leaves the setting
    /// untouched if the extension is empty.
    pub fn set_fragment_extension(&mut self, value: &str) -> bool {
        let value = value.trim_start_matches('.');
        if value.is_empty() {
            false
        } else {
            self.fragment_extension = value.to_string();
            true
        }
    }
}

const fn default_preview_bytes() -> usize {
    200
}

const fn default_ordering() -> i64 {
    10_000
}

const fn default_heal_sidecars() -> bool {
    true
}

fn default_fragment_extension() -> String {
    "wt".to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_preview_bytes")]
        preview_bytes: usize,

        #[serde(default = "default_ordering")]
        default_ordering: i64,

        #[serde(default = "default_heal_sidecars")]
        heal_sidecars: bool,

        #[serde(default = "default_fragment_extension")]
        fragment_extension: String,
    },
}

impl From<Versions> for super::Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                preview_bytes,
                default_ordering,
                heal_sidecars,
                fragment_extension,
            } => Self {
                preview_bytes,
                default_ordering,
                heal_sidecars,
                fragment_extension,
            },
        }
    }
}

impl From<super::Config> for Versions {
    fn from(config: super::Config) -> Self {
        Self::V1 {
            preview_bytes: config.preview_bytes,
            default_ordering: config.default_ordering,
            heal_sidecars: config.heal_sidecars,
            fragment_extension: config.fragment_extension,
        }
    }
}
