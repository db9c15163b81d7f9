mod cli;
mod console;
#[cfg(feature = "wry")]
mod open;
mod setup;

use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use weft_common::{ConfigError, WeftError};
use weft_config::WeftConfig;

use cli::Command;

fn load(path: Option<&str>) -> Result<WeftConfig, ConfigError> {
    match path {
        Some(path) => weft_config::load_config_from(Path::new(path)),
        None => weft_config::load_config(),
    }
}

fn init_logging(directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::INFO.into()),
            ),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(command: Command, config: WeftConfig) -> Result<(), WeftError> {
    match command {
        Command::Console => console::run(&config),
        #[cfg(feature = "wry")]
        Command::Open { url } => open::run(config, url),
        #[cfg(not(feature = "wry"))]
        Command::Open { .. } => Err(WeftError::Other(
            "`open` needs a build with the `wry` feature".into(),
        )),
    }
}

fn main() -> ExitCode {
    let args = cli::parse();

    // Logging depends on the config, so a load failure is reported after.
    let loaded = load(args.config.as_deref());
    let directive = match (&args.log_level, &loaded) {
        (Some(level), _) => level.clone(),
        (None, Ok(config)) => config.logging.level.as_directive().to_string(),
        (None, Err(_)) => "info".to_string(),
    };
    init_logging(&directive);

    tracing::info!("weft v{} starting", env!("CARGO_PKG_VERSION"));
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        WeftConfig::default()
    });
    tracing::debug!(config = %weft_config::config_to_json(&config), "effective config");

    let command = args.command.unwrap_or(Command::Console);
    match dispatch(command, config) {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(fatal = e.is_fatal(), "{e}");
            ExitCode::FAILURE
        }
    }
}
