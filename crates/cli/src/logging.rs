use anyhow::{anyhow, Result};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level applied on top of `RUST_LOG`
    pub level: Level,
    /// Emit one JSON object per event
    pub json: bool,
    /// Include file and line information
    pub file_info: bool,
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::WARN,
            json: false,
            file_info: false,
            app_name: "leadroute".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level,
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }
}

/// Install the global subscriber
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.level.into());

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = if config.json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    installed.map_err(|e| anyhow!("cannot install {} logger: {}", config.app_name, e))
}

pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level).map_err(|_| anyhow!("invalid log level: {}", level))
}
