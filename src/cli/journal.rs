use std::path::PathBuf;

use dialoguer::Confirm;
use manuscript::Project;
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// List operations that were interrupted before they finished
    Show,

    /// Forget every interrupted operation
    ///
    /// Nothing on disk is repaired. Check the listed paths first.
    Clear {
        /// Skip confirmation prompts
        #[arg(long, short)]
        yes: bool,
    },
}

impl Command {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        // The journal is readable even when the outline is not.
        let project = Project::new(root);
        let journal = project.journal();

        match self {
            Self::Show => {
                let entries = journal.entries()?;
                if entries.is_empty() {
                    println!("{}", "✅ No interrupted operations.".success());
                    return Ok(());
                }
                println!(
                    "{}",
                    format!("⚠️  {} interrupted operation(s):", entries.len()).warning()
                );
                for entry in &entries {
                    println!("  • {entry}");
                }
            }
            Self::Clear { yes } => {
                if !yes {
                    let proceed = Confirm::new()
                        .with_prompt("Forget every journal entry?")
                        .default(false)
                        .interact()?;
                    if !proceed {
                        println!("Cancelled");
                        std::process::exit(130);
                    }
                }
                let count = journal.clear()?;
                println!(
                    "{}",
                    format!("✅ Cleared {count} journal entr{}", if count == 1 { "y" } else { "ies" })
                        .success()
                );
            }
        }
        Ok(())
    }
}
