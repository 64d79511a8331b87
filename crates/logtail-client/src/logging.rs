//! Diagnostics subscriber setup
//!
//! Diagnostics go to stderr so tailed text on stdout stays clean.

use std::fmt;
use std::str::FromStr;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as layer_fmt, EnvFilter};

/// Default filter when neither an explicit filter nor `RUST_LOG` is set
pub const DEFAULT_FILTER: &str = "info";

/// Output format for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}', expected text or json")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

fn env_filter(filter: Option<&str>) -> anyhow::Result<EnvFilter> {
    Ok(match filter {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    })
}

/// Install the global tracing subscriber
///
/// `filter` takes `RUST_LOG` syntax; without it `RUST_LOG` is honoured.
///
/// # Errors
/// Invalid filter directives, or a subscriber is already installed
pub fn init(filter: Option<&str>, format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(filter)?);
    match format {
        LogFormat::Text => registry
            .with(layer_fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()?,
        LogFormat::Json => registry
            .with(layer_fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }
    Ok(())
}
