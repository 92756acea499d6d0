//! Agora CLI entry point.

use anyhow::Result;
use clap::Parser;

use agora::cli::{commands, handle_error, Cli, Commands};
use agora::infrastructure::config::ConfigLoader;
use agora::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli.command, cli.config.as_deref(), cli.json).await {
        handle_error(err, cli.json);
    }
}

async fn run(command: Commands, config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&config.logging)?;

    match command {
        Commands::Analyze(args) => commands::analyze::execute(args, &config, json).await,
        Commands::Preview(args) => commands::preview::execute(args, &config, json).await,
        Commands::Graph(args) => commands::graph::execute(args, &config, json).await,
        Commands::Run(args) => commands::run::execute(args, &config, json).await,
    }
}
