//! Logging setup for the `bbank` binary.
//!
//! Command output goes to stdout; log lines go to stderr through a
//! `tracing` subscriber filtered to this crate.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much the binary logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above: sign-ins, workflow transitions, request decisions.
    #[default]
    Normal,
    /// Adds debug lines such as migrations and session refreshes.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Map the `-q` flag and the `-v` count to a level. `-q` wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The most detailed level that gets through.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[must_use]
    pub fn filter_directive(self) -> String {
        format!("bloodbank={}", self.level())
    }
}

/// Install the stderr subscriber.
///
/// `RUST_LOG`, when set and valid, replaces the directive derived from
/// `verbosity`. A second call is a no-op.
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
