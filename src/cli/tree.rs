use std::path::PathBuf;

use clap::Parser;
use manuscript::ResourceType;
use serde_json::json;
use tracing::instrument;

use super::terminal::{Colorize, is_narrow, terminal_width, truncate};

#[derive(Debug, Parser)]
#[command(about = "Print the outline of the project")]
pub struct Command {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,

    /// Show fragment previews
    #[arg(long, short)]
    previews: bool,

    /// Show each node's path
    #[arg(long)]
    paths: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

impl Command {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let project = super::load(root)?;
        let outline = project.outline();

        match self.output {
            OutputFormat::Json => {
                let rows: Vec<_> = outline
                    .walk()
                    .map(|(depth, node)| {
                        json!({
                            "depth": depth,
                            "type": node.resource_type().as_str(),
                            "title": node.ids.display,
                            "ordering": node.ids.ordering,
                            "path": node.key().to_string(),
                            "preview": node.preview(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Pretty => {
                let width = usize::from(terminal_width().unwrap_or(80));
                let narrow = is_narrow();
                for (depth, node) in outline.walk() {
                    let indent = "  ".repeat(depth);
                    let resource_type = node.resource_type();
                    let mut line = format!("{indent}{}", node.ids.display.typed(resource_type));
                    if resource_type.is_indexed() && !narrow {
                        line.push_str(&format!(" {}", format!("[{}]", node.ids.ordering).dim()));
                    }
                    if self.paths {
                        line.push_str(&format!("  {}", node.key().to_string().dim()));
                    }
                    println!("{line}");

                    if self.previews && resource_type == ResourceType::Fragment {
                        let preview = node.preview().unwrap_or_default();
                        if !preview.trim().is_empty() {
                            let room = width.saturating_sub(indent.len() + 4).max(10);
                            println!("{indent}  {}", truncate(preview, room).dim());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
