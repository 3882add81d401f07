use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use session_migration::config::{Config, Settings};
use session_migration_core::{Environment, MigrationEngine};

fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);

    let config = settings.resolve(&cli, &Environment::capture())?;
    let single_file = config.single_file().is_some();

    let summary = MigrationEngine::new(config).run()?;
    tracing::debug!(
        "Run finished: {} migrated, {} failed",
        summary.migrated.len(),
        summary.failed.len()
    );

    // Only a forced single script failing to start is a failed run
    if single_file && !summary.failed.is_empty() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Logs go to stderr; stdout carries the progress lines only
fn setup_logging(debug: bool) {
    let default_directives = if debug {
        "session_migration=debug,session_migration_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
