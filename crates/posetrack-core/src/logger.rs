//! Stderr logger for tracker binaries.
//!
//! Records from the `posetrack*` crates pass at the configured level; records
//! from dependencies (corner detection, image decoding) are capped at `Warn`
//! so a verbose run shows per-frame tracker decisions only. Each line reads
//! `[elapsed LEVEL crate] message`.

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

const OWN_PREFIX: &str = "posetrack";

struct TrackerLogger {
    own: LevelFilter,
    foreign: LevelFilter,
    started: Instant,
}

impl TrackerLogger {
    fn limit_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_PREFIX) {
            self.own
        } else {
            self.foreign
        }
    }
}

fn crate_of(target: &str) -> &str {
    target.split("::").next().unwrap_or(target)
}

impl Log for TrackerLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.limit_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let secs = self.started.elapsed().as_secs_f64();
        let mut out = std::io::stderr().lock();
        let _ = writeln!(
            out,
            "[{secs:8.3}s {:>5} {}] {}",
            record.level(),
            crate_of(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<TrackerLogger> = OnceLock::new();

/// Install the stderr logger; `level` applies to the `posetrack*` crates.
///
/// Only the first call installs anything. Fails if another `log`
/// implementation is already registered.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| TrackerLogger {
        own: level,
        foreign: level.min(Level::Warn.to_level_filter()),
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber that also reports the duration of every
/// `on_frame` span. Honours `RUST_LOG`, defaulting to `posetrack=info`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,posetrack=info,posetrack_core=info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder.with_timer(fmt::time::Uptime::default()).finish().try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger(level: LevelFilter) -> TrackerLogger {
        TrackerLogger {
            own: level,
            foreign: level.min(LevelFilter::Warn),
            started: Instant::now(),
        }
    }

    #[test]
    fn dependencies_are_capped_at_warn() {
        let logger = logger(LevelFilter::Debug);
        assert_eq!(logger.limit_for("posetrack::cross"), LevelFilter::Debug);
        assert_eq!(logger.limit_for("posetrack_core::pnp"), LevelFilter::Debug);
        assert_eq!(logger.limit_for("chess_corners"), LevelFilter::Warn);
    }

    #[test]
    fn quiet_level_applies_everywhere() {
        let logger = logger(LevelFilter::Error);
        assert_eq!(logger.limit_for("image::codecs"), LevelFilter::Error);
    }

    #[test]
    fn crate_name_is_first_path_segment() {
        assert_eq!(crate_of("posetrack::source"), "posetrack");
        assert_eq!(crate_of("kiddo"), "kiddo");
    }
}
