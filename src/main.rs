use anyhow::Result;
use clap::Parser;

use userdesk::{
    app::{load_config, load_config_from, AppState},
    cli::{handle_command, run_init, Cli, Commands},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    // Writing the config must not depend on an existing one
    if let Commands::Init = cli.command {
        return run_init();
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let state = AppState::new(config)?;
    handle_command(&cli.command, &state).await
}
