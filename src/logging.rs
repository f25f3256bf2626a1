//! Subscriber setup for applications embedding fakecheck-core.
//!
//! The library itself only emits `tracing` events. Binaries and tests that
//! want them printed call [`init_tracing`] once at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

/// Maps a configured log level to a `tracing` filter directive.
///
/// `WARNING` and `CRITICAL` have no `tracing` counterpart and map to `warn`
/// and `error`. Unknown values fall back to `info`.
pub fn filter_directive(log_level: &str) -> &'static str {
    match log_level.to_ascii_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        "TRACE" => "trace",
        _ => "info",
    }
}

/// Installs a global fmt subscriber filtered at `config.log_level()`.
///
/// `RUST_LOG`, when set, takes precedence. Returns `false` when a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_tracing(config: &AppConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config.log_level())));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(log_level = config.log_level(), "tracing initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive("DEBUG"), "debug");
        assert_eq!(filter_directive("warning"), "warn");
        assert_eq!(filter_directive("CRITICAL"), "error");
        assert_eq!(filter_directive("verbose"), "info");
    }

    #[test]
    fn test_second_init_is_a_no_op() {
        let config = AppConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
