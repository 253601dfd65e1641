use super::commands;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a restraint list against a coordinate ensemble
    Validate {
        /// Coordinate ensemble (mmCIF or PDB)
        #[arg(long)]
        coordinates: PathBuf,
        /// Restraint document (JSON, one row list per subtype)
        #[arg(long)]
        restraints: PathBuf,
        /// Where to write the report; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
        /// Directory for the digest-keyed report cache
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Skip cache lookup even when a cache directory is set
        #[arg(long)]
        no_cache: bool,
        /// Model id used for non-ensemble lookups
        #[arg(long, default_value_t = 1)]
        representative_model: usize,
    },
}

impl Cli {
    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Validate {
                coordinates,
                restraints,
                output,
                cache_dir,
                no_cache,
                representative_model,
            } => commands::validate::execute(
                coordinates,
                restraints,
                output,
                cache_dir,
                no_cache,
                representative_model,
            ),
        }
    }
}
