use crate::{Error, Result};

use tracing_subscriber::{prelude::*, EnvFilter, Registry};

pub static LOG_FORMAT_ENV_VAR: &str = "LOG_FORMAT";
static DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV_VAR) {
            Ok(value) => Self::parse(&value),
            Err(_) => LogFormat::Compact,
        }
    }

    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}

/// Initialize tracing
///
/// Filtering follows `RUST_LOG` and falls back to `info`.
pub async fn init() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| Error::TelemetryError(e.to_string()))?;

    let result = match LogFormat::from_env() {
        LogFormat::Json => {
            let logger = tracing_subscriber::fmt::layer().json();
            let collector = Registry::default().with(logger).with(env_filter);
            tracing::subscriber::set_global_default(collector)
        }
        LogFormat::Compact => {
            let logger = tracing_subscriber::fmt::layer().compact();
            let collector = Registry::default().with(logger).with(env_filter);
            tracing::subscriber::set_global_default(collector)
        }
    };
    result.map_err(|e| Error::TelemetryError(e.to_string()))
}
