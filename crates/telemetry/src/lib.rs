use std::{io::IsTerminal, str::FromStr};

use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "RSVP_LOG_FORMAT";

/// How log lines are written to stderr.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines, colored when stderr is a terminal.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown log format '{other}' (expected 'text' or 'json')"),
        }
    }
}

impl LogFormat {
    /// Reads the format from `RSVP_LOG_FORMAT`, defaulting to text.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::default()),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Logs go to stderr and are filtered by `RUST_LOG`.
pub fn init_globally() -> anyhow::Result<()> {
    let format = LogFormat::from_env()?;

    let filter = EnvFilter::from_default_env().add_directive("hyper=warn".parse()?);

    let text_layer = (format == LogFormat::Text).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
    });
    let json_layer = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
    });

    registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .try_init()?;
    Ok(())
}
