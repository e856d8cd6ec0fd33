use clap::Parser;

use fusion_cache::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match cli::load_and_merge_config(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = cli::init_logger_from_settings(&settings) {
        eprintln!("Logger initialization error: {:#}", e);
        std::process::exit(3);
    }

    tracing::debug!(
        version = fusion_cache::pkg_version(),
        backend = settings.cache.backend.as_str(),
        "fusion-cache starting"
    );

    if let Err(e) = cli::execute_command(&cli, settings).await {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
