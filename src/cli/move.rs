use std::path::PathBuf;

use manuscript::storage::MoveOutcome;
use tracing::instrument;

use crate::cli::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The node to move
    path: PathBuf,

    /// The node to drop it onto
    target: PathBuf,
}

impl Command {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut project = super::load(root)?;
        let mover = super::resolve(&project, &self.path)?;
        let target = super::resolve(&project, &self.target)?;

        match project.move_node(mover, target)? {
            MoveOutcome::Moved { affected } => {
                println!(
                    "{}",
                    format!(
                        "✅ Moved {} onto {}",
                        self.path.display(),
                        self.target.display()
                    )
                    .success()
                );
                for key in &affected {
                    println!("   {}", key.to_string().dim());
                }
            }
            MoveOutcome::Unchanged => {
                println!(
                    "{}",
                    format!("{} is already there", self.path.display()).dim()
                );
            }
        }

        Ok(())
    }
}
