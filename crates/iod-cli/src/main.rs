//! iod - IoD package directory tool

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use iod_cli::{Cli, Commands, cmd, package_dir};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cmd::list::list(&package_dir(cli.dir)?),
        Commands::Info { name } => cmd::info::info(&package_dir(cli.dir)?, &name),
        Commands::Inspect { file } => cmd::inspect::inspect(&file),
        Commands::Extract { name, output } => {
            cmd::extract::extract(&package_dir(cli.dir)?, &name, &output).await
        }
    }
}
