use std::path::{Path, PathBuf};

mod journal;
mod new;
mod r#move;
mod recycle;
mod remove;
mod show;
mod status;
mod terminal;
mod tree;

use clap::ArgAction;
use manuscript::{
    Config as ProjectConfig, Loaded, NodeId, Project,
    storage::{
        Direction, ReorderOutcome,
        layout::{CONFIG_DIR, CONFIG_FILE},
    },
};
use non_empty_string::NonEmptyString;
use status::Status;
use terminal::Colorize;
use tracing::instrument;

/// Parse a title, rejecting empty or whitespace-only input.
fn parse_title(s: &str) -> Result<NonEmptyString, String> {
    NonEmptyString::new(s.trim().to_string()).map_err(|_| "title must not be empty".to_string())
}

/// Loads the project at `root`, failing if it has not been initialized.
fn load(root: PathBuf) -> anyhow::Result<Project<Loaded>> {
    Ok(Project::new(root).load()?)
}

/// Resolves a project-relative (or absolute) path to a node.
fn resolve(project: &Project<Loaded>, path: &Path) -> anyhow::Result<NodeId> {
    project
        .resolve(path)
        .ok_or_else(|| anyhow::anyhow!("No chapter, snip or fragment at {}", path.display()))
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the root of the writing project
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show project status (default)
    Status(Status),

    /// Create the project skeleton in the root directory
    Init,

    /// Print the outline
    Tree(tree::Command),

    /// Show detailed information about one node
    Show(show::Command),

    /// Create a chapter, snip or fragment
    #[command(subcommand)]
    New(new::Command),

    /// Move a node onto a target
    ///
    /// Fragments land in the target chapter or snip, or beside a target
    /// fragment. Snips land in the nearest snips container. Chapters and
    /// the root cannot be moved.
    Move(r#move::Command),

    /// Change a node's position among its siblings
    Reorder(Reorder),

    /// Set the title of a chapter, snip or fragment
    Rename(Rename),

    /// Move nodes into the recycle bin
    Remove(remove::Command),

    /// Inspect or restore recycled nodes
    #[command(subcommand)]
    Recycle(recycle::Command),

    /// Inspect or clear the operation journal
    #[command(subcommand)]
    Journal(journal::Command),

    /// Show or modify configuration settings
    Config(Config),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init => Init::run(&root)?,
            Self::Tree(command) => command.run(root)?,
            Self::Show(command) => command.run(root)?,
            Self::New(command) => command.run(root)?,
            Self::Move(command) => command.run(root)?,
            Self::Reorder(command) => command.run(root)?,
            Self::Rename(command) => command.run(root)?,
            Self::Remove(command) => command.run(root)?,
            Self::Recycle(command) => command.run(root)?,
            Self::Journal(command) => command.run(root)?,
            Self::Config(command) => command.run(&root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &Path) -> anyhow::Result<()> {
        Project::new(root.to_path_buf()).init()?;

        println!("Initialized writing project in {}", root.display());
        println!("  Created: data/chapters/.config");
        println!("  Created: data/snips/.config");
        println!("  Created: data/recycling/");
        println!("  Created: {CONFIG_DIR}/{CONFIG_FILE}");
        println!();
        println!("Next steps:");
        println!("  wt new chapter --title \"Chapter One\"");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Reorder {
    /// The node to reposition
    path: PathBuf,

    /// Take the position of this sibling
    #[arg(long, conflicts_with_all = ["up", "down"])]
    onto: Option<PathBuf>,

    /// Swap with the previous sibling
    #[arg(long, conflicts_with = "down")]
    up: bool,

    /// Swap with the next sibling
    #[arg(long)]
    down: bool,
}

impl Reorder {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut project = load(root)?;
        let id = resolve(&project, &self.path)?;

        let outcome = match (self.onto, self.up, self.down) {
            (Some(onto), _, _) => {
                let target = resolve(&project, &onto)?;
                project.reorder(id, target)?
            }
            (None, true, _) => project.nudge(id, Direction::Up)?,
            (None, false, true) => project.nudge(id, Direction::Down)?,
            (None, false, false) => anyhow::bail!("Give --onto <PATH>, --up or --down"),
        };

        match outcome {
            ReorderOutcome::Reordered => {
                println!("{}", format!("✅ Reordered {}", self.path.display()).success());
            }
            ReorderOutcome::Unchanged => {
                println!("{}", format!("{} is already in place", self.path.display()).dim());
            }
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Rename {
    /// The node to rename
    path: PathBuf,

    /// The new title
    #[clap(value_parser = parse_title)]
    title: NonEmptyString,
}

impl Rename {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut project = load(root)?;
        let id = resolve(&project, &self.path)?;

        project.rename(id, self.title.clone())?;

        println!(
            "{}",
            format!("✅ Renamed {} to '{}'", self.path.display(), self.title).success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Print one configuration value
    Get {
        /// Configuration key to read
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,

        /// Value to set
        value: String,
    },
}

const CONFIG_KEYS: [&str; 4] = [
    "preview_bytes",
    "default_ordering",
    "heal_sidecars",
    "fragment_extension",
];

fn config_value(config: &ProjectConfig, key: &str) -> anyhow::Result<String> {
    Ok(match key {
        "preview_bytes" => config.preview_bytes().to_string(),
        "default_ordering" => config.default_ordering().to_string(),
        "heal_sidecars" => config.heal_sidecars.to_string(),
        "fragment_extension" => config.fragment_extension().to_string(),
        _ => anyhow::bail!(
            "Unknown configuration key: {key}. Valid keys are: {}",
            CONFIG_KEYS.join(", ")
        ),
    })
}

impl Config {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            ProjectConfig::load(&config_path).map_err(|e| anyhow::anyhow!("{e}"))?
        } else {
            ProjectConfig::default()
        };

        match self.command {
            ConfigCommand::Show => {
                println!("Configuration:");
                for key in CONFIG_KEYS {
                    println!("  {key}: {}", config_value(&config, key)?);
                }
                if !config_path.exists() {
                    println!("{}", "  (defaults; no config file yet)".dim());
                }
            }
            ConfigCommand::Get { key } => println!("{}", config_value(&config, &key)?),
            ConfigCommand::Set { key, value } => {
                match key.as_str() {
                    "preview_bytes" => config.set_preview_bytes(
                        value
                            .parse()
                            .map_err(|_| anyhow::anyhow!("Value must be a non-negative integer"))?,
                    ),
                    "default_ordering" => config.set_default_ordering(
                        value
                            .parse()
                            .map_err(|_| anyhow::anyhow!("Value must be an integer"))?,
                    ),
                    "heal_sidecars" => {
                        config.heal_sidecars = value
                            .parse()
                            .map_err(|_| anyhow::anyhow!("Value must be 'true' or 'false'"))?;
                    }
                    "fragment_extension" => {
                        if !config.set_fragment_extension(&value) {
                            anyhow::bail!("Fragment extension must not be empty");
                        }
                    }
                    _ => {
                        config_value(&config, &key)?;
                    }
                }
                config
                    .save(&config_path)
                    .map_err(|e| anyhow::anyhow!("{e}"))?;

                println!(
                    "{}",
                    format!("{key} = {}", config_value(&config, &key)?).success()
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use manuscript::ResourceType;
    use tempfile::tempdir;

    use super::*;

    fn initialized() -> tempfile::TempDir {
        let tmp = tempdir().unwrap();
        Init::run(tmp.path()).expect("init should succeed");
        tmp
    }

    fn chapter_path(root: &Path) -> PathBuf {
        let project = load(root.to_path_buf()).unwrap();
        let outline = project.outline();
        outline
            .children(outline.chapters())
            .first()
            .map(|chapter| chapter.ids.path())
            .expect("expected a chapter")
    }

    #[test]
    fn arguments_parse_into_commands() {
        let cli = Cli::try_parse_from(["wt", "-vv", "--root", "book", "rename", "data/x", "Title"])
            .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.root, PathBuf::from("book"));
        assert!(matches!(cli.command, Some(Command::Rename(_))));
    }

    #[test]
    fn empty_titles_are_rejected_at_the_boundary() {
        assert!(Cli::try_parse_from(["wt", "rename", "data/x", "   "]).is_err());
        assert!(parse_title(" Opening ").is_ok_and(|t| t.as_str() == "Opening"));
    }

    #[test]
    fn reorder_flags_conflict() {
        assert!(Cli::try_parse_from(["wt", "reorder", "data/x", "--up", "--down"]).is_err());
        assert!(
            Cli::try_parse_from(["wt", "reorder", "data/x", "--onto", "data/y", "--up"]).is_err()
        );
    }

    #[test]
    fn rename_run_updates_the_title() {
        let tmp = initialized();
        let root = tmp.path().to_path_buf();
        let mut project = load(root.clone()).unwrap();
        project.new_chapter(Default::default()).unwrap();
        let path = chapter_path(&root);

        Rename {
            path: path.clone(),
            title: parse_title("Opening").unwrap(),
        }
        .run(root.clone())
        .expect("rename should succeed");

        let project = load(root).unwrap();
        let id = project.resolve(&path).unwrap();
        let node = project.node(id).unwrap();
        assert_eq!(node.resource_type(), ResourceType::Chapter);
        assert_eq!(node.ids.display, "Opening");
    }

    #[test]
    fn reorder_run_requires_a_direction() {
        let tmp = initialized();
        let root = tmp.path().to_path_buf();
        let mut project = load(root.clone()).unwrap();
        project.new_chapter(Default::default()).unwrap();
        let path = chapter_path(&root);

        let reorder = Reorder {
            path,
            onto: None,
            up: false,
            down: false,
        };

        assert!(reorder.run(root).is_err());
    }

    #[test]
    fn config_set_persists_values() {
        let tmp = initialized();
        let root = tmp.path();

        Config {
            command: ConfigCommand::Set {
                key: "fragment_extension".to_string(),
                value: ".md".to_string(),
            },
        }
        .run(root)
        .expect("set should succeed");

        let config = ProjectConfig::load(&root.join(CONFIG_DIR).join(CONFIG_FILE)).unwrap();
        assert_eq!(config.fragment_extension(), "md");
    }

    #[test]
    fn config_rejects_unknown_keys_and_bad_values() {
        let tmp = initialized();
        let root = tmp.path();

        let unknown = Config {
            command: ConfigCommand::Set {
                key: "colour".to_string(),
                value: "blue".to_string(),
            },
        };
        assert!(unknown.run(root).is_err());

        let bad = Config {
            command: ConfigCommand::Set {
                key: "heal_sidecars".to_string(),
                value: "maybe".to_string(),
            },
        };
        assert!(bad.run(root).is_err());
    }
}
