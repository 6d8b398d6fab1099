//! Opt-in `tracing` setup for hosts embedding the plugin bus.
//!
//! Plugins only emit events: configuration problems (missing bus, missing
//! cursor slot) at `warn`, lifecycle transitions at `debug`, per-pointer
//! work such as snapshots, focus recomputation and bus flushes at `trace`.
//! Nothing is printed until the host installs a subscriber.

/// Filter used when `RUST_LOG` is unset: this crate's warnings only.
pub const DEFAULT_FILTER: &str = "chart_plugin_bus=warn";

/// Filter that surfaces every bus write and flush round; noisy.
pub const BUS_TRACE_FILTER: &str = "chart_plugin_bus::bus=trace,chart_plugin_bus=debug";

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`].
///
/// Returns `false` without the `telemetry` feature or when the host already
/// set a global subscriber.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));
        return install(filter);
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}

/// Like [`init_default_tracing`] but with explicit directives, e.g.
/// [`BUS_TRACE_FILTER`] while debugging multi-chart sync.
///
/// Returns `false` for unparsable directives as well.
#[must_use]
pub fn init_tracing_with_filter(directives: &str) -> bool {
    #[cfg(feature = "telemetry")]
    {
        return match tracing_subscriber::EnvFilter::try_new(directives) {
            Ok(filter) => install(filter),
            Err(_) => false,
        };
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = directives;
        false
    }
}

#[cfg(feature = "telemetry")]
fn install(filter: tracing_subscriber::EnvFilter) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .is_ok()
}
