//! Stderr logger for the `gingham` tools.
//!
//! Lines look like `[  0.123s  INFO] message`, timed from installation.
//! `init_with_level` installs it once; later calls are no-ops.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn format(&self, record: &Record) -> String {
        format!(
            "[{:7.3}s {:>5}] {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.args()
        )
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = self.format(record);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the given level filter.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Parse `off|error|warn|info|debug|trace` (case-insensitive).
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(s.trim()).ok()
}

/// `RUST_LOG` when set, `default_level` otherwise.
#[cfg(feature = "tracing")]
fn filter_directives(rust_log: Option<String>, default_level: LevelFilter) -> String {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ => default_level.as_str().to_ascii_lowercase(),
    }
}

/// Install a `tracing` subscriber filtered at `default_level`; `RUST_LOG`
/// takes precedence when set.
///
/// With `json` set, events and closed spans are emitted as flat JSON lines.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, default_level: LevelFilter) {
    let fallback = default_level.as_str().to_ascii_lowercase();
    let directives = filter_directives(std::env::var(EnvFilter::DEFAULT_ENV).ok(), default_level);
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(fallback));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().flatten_event(true).finish().try_init();
    } else {
        let _ = builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}
