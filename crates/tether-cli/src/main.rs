mod cli;
mod commands;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = cli::Cli::parse();
    cli.execute()
}
