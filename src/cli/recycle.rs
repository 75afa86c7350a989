use std::path::PathBuf;

use anyhow::bail;
use chrono::{DateTime, Local};
use manuscript::{ResourceType, storage::layout::DATA_DIR};
use tracing::instrument;

use super::terminal::{Colorize, is_narrow};

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// List everything in the recycle bin, oldest first
    List,

    /// Move a recycled node back into the project
    ///
    /// Chapters always return to the end of the manuscript. Snips and
    /// fragments follow the same rules as a move onto the target. Snips
    /// default to the work snips. Fragments need a chapter, snip or
    /// fragment to land in.
    Restore {
        /// The recycle bin name shown by 'wt recycle list'
        name: String,

        /// Where to put it (required for fragments)
        #[arg(long)]
        into: Option<PathBuf>,
    },
}

fn deleted_at(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis).map_or_else(
        || "unknown time".to_string(),
        |utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}

impl Command {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::List => {
                let project = super::load(root)?;
                let records = project.recycled()?;
                if records.is_empty() {
                    println!("The recycle bin is empty.");
                    return Ok(());
                }

                let narrow = is_narrow();
                for record in &records {
                    let title = record.title.as_deref().unwrap_or("(untitled)");
                    if narrow {
                        println!("{}", title.typed(record.resource_type));
                        println!("  {}", record.recycle_bin_name.dim());
                    } else {
                        println!(
                            "{:<9} {:<30} {} {}",
                            record.resource_type,
                            title.typed(record.resource_type),
                            deleted_at(record.delete_timestamp).dim(),
                            record.recycle_bin_name.dim()
                        );
                    }
                }
            }
            Self::Restore { name, into } => {
                let mut project = super::load(root)?;
                let into = match into {
                    Some(into) => into,
                    None => {
                        let is_fragment = project.recycled()?.iter().any(|record| {
                            record.recycle_bin_name == name
                                && record.resource_type == ResourceType::Fragment
                        });
                        if is_fragment {
                            bail!("'{name}' is a fragment: pass --into with a chapter or snip");
                        }
                        PathBuf::from(DATA_DIR)
                    }
                };
                let target = super::resolve(&project, &into)?;
                let key = project.restore(&name, target)?;
                println!("{}", format!("✅ Restored {name}").success());
                println!("   {}", key.to_string().dim());
            }
        }
        Ok(())
    }
}
