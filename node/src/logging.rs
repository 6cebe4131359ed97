//! # Structured Logging
//!
//! Initializes the `tracing` subscriber, pretty or JSON, with filtering from
//! `RUST_LOG`. Output goes to stderr; stdout is reserved for the `config`
//! subcommand's JSON.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormatArg;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "snp_node=info,snp_engine=info,tower_http=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// JSON lines.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Installs the global subscriber. Call once, early in `main()`.
///
/// `RUST_LOG` overrides `default_directives` when set, e.g.
///
/// ```text
/// RUST_LOG=snp_engine=debug,snp_node=info
/// ```
pub fn init_logging(default_directives: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(true);

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr.with_file(true).with_line_number(true))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr.json())
                .init();
        }
    }

    tracing::info!("logging initialized (format={:?})", format);
}
