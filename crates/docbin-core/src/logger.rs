//! Stderr logging for the command-line tool.
//!
//! Records from the `docbin*` crates pass at the requested level; everything
//! else (decoders, dependencies) is capped at `warn` so `-vvv` stays readable.
//! With the `tracing` feature, [`init_tracing`] installs a `tracing-subscriber`
//! pipeline with the same per-crate split expressed as an env filter.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_PREFIX: &str = "docbin";

fn is_own_target(target: &str) -> bool {
    target.starts_with(OWN_PREFIX)
}

struct DocbinLogger {
    own: LevelFilter,
    foreign: LevelFilter,
    started: Instant,
}

impl DocbinLogger {
    fn threshold(&self, target: &str) -> LevelFilter {
        if is_own_target(target) {
            self.own
        } else {
            self.foreign
        }
    }
}

fn tag(level: Level) -> &'static str {
    match level {
        Level::Error => "E",
        Level::Warn => "W",
        Level::Info => "I",
        Level::Debug => "D",
        Level::Trace => "T",
    }
}

impl Log for DocbinLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.threshold(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let crate_name = record.target().split("::").next().unwrap_or_default();
        let ms = self.started.elapsed().as_secs_f64() * 1e3;
        let _ = writeln!(
            std::io::stderr().lock(),
            "{} {:>9.1}ms {}: {}",
            tag(record.level()),
            ms,
            crate_name,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<DocbinLogger> = OnceLock::new();

/// `-v` count to level: warn, info, debug, then trace.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the stderr logger. A second call keeps the first configuration.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| DocbinLogger {
        own: level,
        foreign: level.min(LevelFilter::Warn),
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Env-filter directive for `level`, used when `RUST_LOG` is unset.
pub fn filter_directive(level: LevelFilter) -> String {
    let own = level.to_string().to_lowercase();
    let foreign = level.min(LevelFilter::Warn).to_string().to_lowercase();
    ["docbin", "docbin_core", "docbin_otsu", "docbin_metrics"]
        .iter()
        .fold(foreign, |acc, krate| format!("{acc},{krate}={own}"))
}

/// Install a `tracing` subscriber. Span close events carry stage timings;
/// `json` switches to one flattened JSON object per line.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_saturates_at_trace() {
        assert_eq!(level_for_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_for_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_for_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn foreign_targets_are_capped_at_warn() {
        let logger = DocbinLogger {
            own: LevelFilter::Debug,
            foreign: LevelFilter::Warn,
            started: Instant::now(),
        };
        assert_eq!(logger.threshold("docbin_otsu::pipeline"), LevelFilter::Debug);
        assert_eq!(logger.threshold("png::decoder"), LevelFilter::Warn);
    }

    #[test]
    fn directive_names_every_crate() {
        assert_eq!(
            filter_directive(LevelFilter::Debug),
            "warn,docbin=debug,docbin_core=debug,docbin_otsu=debug,docbin_metrics=debug"
        );
        assert!(filter_directive(LevelFilter::Error).starts_with("error,"));
    }
}
