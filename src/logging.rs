use clap::{Args, ValueEnum};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Logging configuration shared by all subcommands.
#[derive(Args, Debug, Clone)]
pub struct Logger {
    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Log level filter, in tracing env-filter syntax
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Logger {
    pub fn init(&self) -> anyhow::Result<()> {
        let filter =
            EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
        match self.log_format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json().with_current_span(false))
                    .try_init()
                    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            }
            LogFormat::Text => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().with_target(false))
                    .try_init()
                    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            }
        }
        Ok(())
    }
}
