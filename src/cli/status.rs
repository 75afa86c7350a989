use std::{path::PathBuf, process};

use clap::Parser;
use manuscript::{Loaded, Project, ResourceType, storage::JournalEntry};
use tracing::instrument;

use super::terminal::{Colorize, is_narrow};

#[derive(Debug, Parser, Default)]
#[command(about = "Show node counts, the recycle bin and interrupted operations")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

const COUNTED: [ResourceType; 3] = [
    ResourceType::Chapter,
    ResourceType::Snip,
    ResourceType::Fragment,
];

struct Summary<'a> {
    counts: Vec<(ResourceType, usize)>,
    recycled: usize,
    interrupted: &'a [JournalEntry],
}

impl<'a> Summary<'a> {
    fn gather(project: &'a Project<Loaded>) -> anyhow::Result<Self> {
        let outline = project.outline();
        Ok(Self {
            counts: COUNTED
                .into_iter()
                .map(|resource_type| (resource_type, outline.count(resource_type)))
                .collect(),
            recycled: project.recycled()?.len(),
            interrupted: project.interrupted(),
        })
    }

    fn is_empty(&self) -> bool {
        self.counts.iter().all(|&(_, count)| count == 0) && self.recycled == 0
    }
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let project = super::load(root)?;
        let summary = Summary::gather(&project)?;

        if summary.is_empty() && summary.interrupted.is_empty() {
            println!("Nothing written yet. Create a chapter with 'wt new chapter'.");
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => Self::output_json(&summary)?,
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(&summary);
                } else {
                    Self::output_table(&summary);
                }
            }
        }

        // Exit with a non-zero code when the project needs attention.
        if !summary.interrupted.is_empty() {
            process::exit(2);
        }

        Ok(())
    }

    fn output_json(summary: &Summary<'_>) -> anyhow::Result<()> {
        use serde_json::json;

        let counts: serde_json::Map<String, serde_json::Value> = summary
            .counts
            .iter()
            .map(|(resource_type, count)| (resource_type.as_str().to_string(), json!(count)))
            .collect();
        let interrupted: Vec<String> = summary
            .interrupted
            .iter()
            .map(ToString::to_string)
            .collect();

        let output = json!({
            "counts": counts,
            "recycled": summary.recycled,
            "interrupted": interrupted,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(summary: &Summary<'_>) {
        let counts: Vec<String> = summary
            .counts
            .iter()
            .map(|(resource_type, count)| format!("{resource_type}s={count}"))
            .collect();
        println!(
            "{} recycled={} interrupted={}",
            counts.join(" "),
            summary.recycled,
            summary.interrupted.len()
        );
    }

    fn output_table(summary: &Summary<'_>) {
        const MAX_INTERRUPTED_DISPLAY: usize = 5;
        let narrow = is_narrow();

        println!("Outline");
        println!("{}", "───────".dim());

        if narrow {
            for (resource_type, count) in &summary.counts {
                println!("{resource_type}s: {count}");
            }
        } else {
            println!("{:<10} Count", "Type");
            for (resource_type, count) in &summary.counts {
                println!("{:<10} {count}", format!("{resource_type}s"));
            }
        }

        println!();
        println!("Recycle bin: {}", summary.recycled.to_string().info());
        println!();

        let interrupted = summary.interrupted.len();
        if interrupted == 0 {
            println!("Interrupted operations: {} ✅", "0".success());
        } else {
            println!(
                "Interrupted operations: {} ⚠️",
                interrupted.to_string().warning()
            );
            for entry in summary.interrupted.iter().take(MAX_INTERRUPTED_DISPLAY) {
                println!("  - {entry}");
            }
            if interrupted > MAX_INTERRUPTED_DISPLAY {
                println!(
                    "  - ... and {} more",
                    interrupted - MAX_INTERRUPTED_DISPLAY
                );
            }
            println!(
                "{}",
                "Check these paths, then run 'wt journal clear'.".dim()
            );
        }
    }
}
