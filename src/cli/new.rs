use std::path::PathBuf;

use manuscript::{
    NodeKey,
    storage::{CreateOptions, layout::DATA_DIR},
};
use non_empty_string::NonEmptyString;
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Append a chapter to the manuscript
    Chapter {
        #[command(flatten)]
        options: Options,
    },

    /// Create a snip
    ///
    /// On a snip the new snip is nested inside it. On a chapter, or anything
    /// within one, it goes in the chapter's snips. Otherwise it goes in the
    /// work snips.
    Snip {
        /// Where to create it
        #[arg(long, default_value = DATA_DIR)]
        at: PathBuf,

        #[command(flatten)]
        options: Options,
    },

    /// Create an empty fragment in a chapter or snip, or beside a fragment
    Fragment {
        /// Where to create it
        at: PathBuf,

        /// The title (defaults to a numbered "New Fragment")
        #[arg(long, short, value_parser = super::parse_title)]
        title: Option<NonEmptyString>,
    },
}

#[derive(Debug, clap::Args)]
pub struct Options {
    /// The title (defaults to a numbered name)
    #[arg(long, short, value_parser = super::parse_title)]
    title: Option<NonEmptyString>,

    /// Do not create an initial fragment
    #[arg(long)]
    empty: bool,
}

impl From<Options> for CreateOptions {
    fn from(options: Options) -> Self {
        Self {
            title: options.title,
            skip_fragment: options.empty,
        }
    }
}

impl Command {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut project = super::load(root)?;

        let (noun, key): (&str, NodeKey) = match self {
            Self::Chapter { options } => ("chapter", project.new_chapter(options.into())?),
            Self::Snip { at, options } => {
                let at = super::resolve(&project, &at)?;
                ("snip", project.new_snip(at, options.into())?)
            }
            Self::Fragment { at, title } => {
                let at = super::resolve(&project, &at)?;
                let options = CreateOptions {
                    title,
                    ..CreateOptions::default()
                };
                ("fragment", project.new_fragment(at, options)?)
            }
        };

        let title = project
            .outline()
            .find_by_key(&key)
            .map(|node| node.ids.display.clone())
            .unwrap_or_default();
        println!("{}", format!("✅ Created {noun} '{title}'").success());
        println!("   {}", key.to_string().dim());
        Ok(())
    }
}
