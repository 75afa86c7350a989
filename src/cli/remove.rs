use std::path::PathBuf;

use dialoguer::Confirm;
use manuscript::{ResourceType, storage::RemoveError};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The nodes to remove
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Skip confirmation prompts
    #[arg(long, short)]
    yes: bool,
}

impl Command {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut project = super::load(root)?;

        let selection = self
            .paths
            .iter()
            .map(|path| super::resolve(&project, path))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let targets = project.local_roots(&selection);

        if !self.yes {
            println!("Will move {} item(s) to the recycle bin:", targets.len());
            for node in targets.iter().filter_map(|&id| project.node(id)) {
                let note = match node.resource_type() {
                    ResourceType::Container => " (contents only)".dim(),
                    _ => String::new(),
                };
                println!(
                    "  • {}{note} {}",
                    node.ids.display.typed(node.resource_type()),
                    node.key().to_string().dim()
                );
            }

            let proceed = Confirm::new()
                .with_prompt("Proceed?")
                .default(false)
                .interact()?;
            if !proceed {
                println!("Cancelled");
                std::process::exit(130);
            }
        }

        match project.remove(&targets) {
            Ok(records) => {
                println!(
                    "{}",
                    format!("✅ Recycled {} item(s)", records.len()).success()
                );
                for record in &records {
                    println!("   {}", record.recycle_bin_name.dim());
                }
                Ok(())
            }
            Err(RemoveError::Incomplete(failures)) => {
                eprintln!(
                    "{}",
                    format!("⚠️  Recycled {} item(s), but some failed:", failures.recycled())
                        .warning()
                );
                for (path, error) in failures.failures() {
                    eprintln!("  • {}: {error}", path.display());
                }
                eprintln!("{}", "Run 'wt journal show' to see unfinished steps.".dim());
                Err(failures.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use manuscript::{Project, storage::CreateOptions};
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn remove_run_recycles_without_prompting() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        Project::new(root.clone()).init().unwrap();
        let mut project = super::super::load(root.clone()).unwrap();
        let key = project.new_chapter(CreateOptions::default()).unwrap();

        Command {
            paths: vec![key.path()],
            yes: true,
        }
        .run(root.clone())
        .expect("remove should succeed");

        let project = super::super::load(root).unwrap();
        assert!(project.resolve(&key.path()).is_none());
        let records = project.recycled().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resource_type, ResourceType::Chapter);
    }

    #[test]
    fn remove_run_rejects_unknown_paths() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        Project::new(root.clone()).init().unwrap();

        let command = Command {
            paths: vec![PathBuf::from("data/chapters/missing")],
            yes: true,
        };

        assert!(command.run(root).is_err());
    }
}
