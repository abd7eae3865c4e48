//! # Logging
//!
//! Installs the process-wide `tracing` subscriber for the node. Operators
//! pick between colored console lines and one JSON object per event; the
//! `RUST_LOG` variable, when present, replaces [`DEFAULT_FILTER`].
//!
//! Events go to stderr. Stdout belongs to the `params` subcommand, whose
//! JSON is meant to be piped.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used when `RUST_LOG` is unset. Loan state changes surface at
/// `info` and refused requests at `warn`; token ledger chatter stays quiet.
pub const DEFAULT_FILTER: &str =
    "nftlend_node=info,nftlend_contracts=info,nftlend_protocol=warn,tower_http=info";

/// How log events are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored lines with source locations, for a terminal.
    Pretty,
    /// One JSON object per event, for log shippers.
    Json,
}

impl LogFormat {
    /// `"json"` in any casing selects [`LogFormat::Json`]; anything else
    /// falls back to [`LogFormat::Pretty`].
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Builds the filter from `RUST_LOG`, or from `fallback` when the variable
/// is missing or malformed.
fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Installs the global subscriber. Fails if one is already installed.
///
/// ```text
/// RUST_LOG=nftlend_contracts=debug nftlend-node run --log-format json
/// ```
pub fn init_logging(default_filter: &str, format: LogFormat) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(default_filter));

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
    }
    .context("a tracing subscriber is already installed")?;

    tracing::debug!(?format, "subscriber installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_is_lenient() {
        assert_eq!(LogFormat::from_str_lossy("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_lossy("whatever"), LogFormat::Pretty);
    }

    #[test]
    fn default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }
}
