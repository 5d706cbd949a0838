//! Tracing setup for the scope3 binary.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Crates whose level follows the command-line flags.
const CRATES: &[&str] = &["scope3", "cli", "client", "mcp", "agents", "allocation"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
    /// Single-line human-readable output
    Compact,
}

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// INFO and above.
    pub verbose: bool,
    /// DEBUG and above; includes per-call debug records.
    pub debug: bool,
    /// ERROR only.
    pub quiet: bool,
}

impl LoggingConfig {
    pub fn level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else if self.debug {
            Level::DEBUG
        } else if self.verbose {
            Level::INFO
        } else {
            Level::WARN
        }
    }

    fn flags_set(&self) -> bool {
        self.quiet || self.debug || self.verbose
    }
}

static INITIALIZED: OnceLock<()> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Install the global subscriber. Later calls are ignored.
///
/// `RUST_LOG` applies only when no verbosity flag was given.
pub fn init(config: &LoggingConfig) {
    if INITIALIZED.get().is_some() {
        return;
    }

    let directives = filter_directives(config.level());
    let filter = if config.flags_set() {
        EnvFilter::new(directives)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
    };

    let layer: BoxedLayer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    };

    // A subscriber installed by an embedding process wins.
    let _ = tracing_subscriber::registry().with(layer).try_init();
    let _ = INITIALIZED.set(());
}

fn filter_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    let mut directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    directives.push("warn".to_string());
    directives.join(",")
}
