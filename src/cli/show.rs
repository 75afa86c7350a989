use std::path::PathBuf;

use clap::Parser;
use manuscript::{Node, Outline};
use serde_json::json;
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Display detailed information about a node")]
pub struct Command {
    /// The project-relative path of the node
    path: PathBuf,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
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
        let id = super::resolve(&project, &self.path)?;
        let outline = project.outline();
        let Some(node) = project.node(id) else {
            anyhow::bail!("No node at {}", self.path.display());
        };

        match self.output {
            OutputFormat::Pretty => output_pretty(outline, node),
            OutputFormat::Json => output_json(outline, node)?,
        }
        Ok(())
    }
}

fn trail(outline: &Outline, node: &Node) -> Vec<String> {
    let mut titles: Vec<String> = outline
        .ancestors(node.id())
        .map(|ancestor| ancestor.ids.display.clone())
        .collect();
    titles.reverse();
    titles
}

fn output_pretty(outline: &Outline, node: &Node) {
    let resource_type = node.resource_type();

    println!("{}", node.ids.display.typed(resource_type));
    println!("{}", "─".repeat(node.ids.display.chars().count().max(8)).dim());
    println!("Type:     {resource_type}");
    println!("Path:     {}", node.key());
    if resource_type.is_indexed() {
        println!("Ordering: {}", node.ids.ordering);
    }

    let trail = trail(outline, node);
    if !trail.is_empty() {
        println!("Within:   {}", trail.join(" › ").dim());
    }

    let children = outline.children(node.id());
    if !children.is_empty() {
        println!();
        println!("Contents ({}):", children.len());
        for child in children {
            println!(
                "  • {} {}",
                child.ids.display.typed(child.resource_type()),
                format!("({})", child.resource_type()).dim()
            );
        }
    }

    if let Some(preview) = node.preview() {
        println!();
        if preview.is_empty() {
            println!("{}", "(empty)".dim());
        } else {
            println!("{preview}");
        }
    }
}

fn output_json(outline: &Outline, node: &Node) -> anyhow::Result<()> {
    let children: Vec<_> = outline
        .children(node.id())
        .into_iter()
        .map(|child| {
            json!({
                "type": child.resource_type().as_str(),
                "title": child.ids.display,
                "path": child.key().to_string(),
            })
        })
        .collect();

    let output = json!({
        "type": node.resource_type().as_str(),
        "title": node.ids.display,
        "path": node.key().to_string(),
        "ordering": node.ids.ordering,
        "parent_type": node.ids.parent_type.map(|t| t.as_str()),
        "within": trail(outline, node),
        "children": children,
        "preview": node.preview(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
