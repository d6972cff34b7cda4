//! Process-wide tracing setup.
//!
//! One registry with an `EnvFilter` (`RUST_LOG`, falling back to a default)
//! and a compact fmt layer stamped with RFC 3339 UTC times.

use std::io::{self, IsTerminal};

use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
};

/// Library targets that get the per-crate level from [`init`].
pub const WORKSPACE_TARGETS: &[&str] = &[
    "api",
    "report_pipeline",
    "report_store",
    "blob_store",
    "ai_llm_service",
];

/// Example output: `2026-03-01T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// Compact single-line layer; span close events carry durations of
/// instrumented pipeline stages.
pub fn layer<S>() -> impl tracing_subscriber::Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let format = fmt::format()
        .compact()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_source_location(true);

    fmt::layer()
        .with_ansi(io::stdout().is_terminal())
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(format)
}

/// `target=level`, or `None` if the pair does not form a valid directive.
pub fn level_directive(target: &str, level: Level) -> Option<Directive> {
    format!("{target}={}", level.as_str().to_lowercase())
        .parse()
        .ok()
}

/// `RUST_LOG` if set, else `default`; workspace crates are raised to `level`
/// unless `RUST_LOG` is set.
pub fn env_filter(default: &str, level: Level) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => WORKSPACE_TARGETS
            .iter()
            .filter_map(|t| level_directive(t, level))
            .fold(EnvFilter::new(default), EnvFilter::add_directive),
    }
}

/// Installs the global subscriber. Fails if one is already set.
pub fn init(default: &str, level: Level) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default, level))
        .with(layer())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_are_built_per_target() {
        let d = level_directive("report_pipeline", Level::DEBUG).unwrap();
        assert_eq!(d.to_string(), "report_pipeline=debug");
    }
}
