//! Stderr logging for the navigation binaries.
//!
//! Each record becomes one line, `[elapsed LEVEL crate] message`, where the
//! crate column drops the `visnav_` prefix (`core`, `grid`, `dispatch`, ...).
//! A loop iteration logs from several crates at once, so the column is what
//! makes a trace readable. Install with [`init_with_level`], or with
//! [`init_tracing`] under the `tracing` feature.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};

/// Short crate name shown in the log column.
pub(crate) fn short_target(target: &str) -> &str {
    let krate = target.split("::").next().unwrap_or(target);
    krate.strip_prefix("visnav_").unwrap_or(krate)
}

fn write_line(
    out: &mut impl Write,
    elapsed_s: f64,
    level: Level,
    target: &str,
    args: fmt::Arguments<'_>,
) -> std::io::Result<()> {
    writeln!(
        out,
        "[{elapsed_s:8.3}s {level:>5} {:<8}] {args}",
        short_target(target)
    )
}

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = write_line(
            &mut stderr,
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            *record.args(),
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger at `level`.
///
/// Only the first call installs; later calls return `Ok(())` and leave the
/// level unchanged.
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

/// Install a `tracing` subscriber and bridge `log` records into it.
///
/// `RUST_LOG` wins when set; otherwise `level` is the filter.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    let _ = tracing_log::LogTracer::init();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    let builder = tracing_fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(tracing_fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
