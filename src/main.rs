use clap::Parser;
use dotenvy::dotenv;
use tracing::debug;

use coaster_admin::config::AppConfig;
use coaster_admin::interfaces::cli::{Cli, run_cli_command};
use coaster_admin::system::logging::init_logging;

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config);
    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{}", e.format_colored());
            None
        }
    };
    debug!("Storage backend: {:?}", config.storage.backend);

    if let Err(e) = run_cli_command(cli.command, config).await {
        eprintln!("{}", e.format_colored());
        std::process::exit(1);
    }
}
