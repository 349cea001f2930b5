//! Logging setup for Cluster Claimer.
//!
//! One subscriber serves both the server and the CLI. Our own crates log
//! at the configured level; HTTP client plumbing is held at `warn` so a
//! refresh cycle does not drown out lease events.

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer, Registry,
};

/// Crates whose events follow the configured level.
const CLAIMER_TARGETS: &[&str] = &[
    "kc_core",
    "kc_connectors",
    "kc_api",
    "cluster_claimer",
    "tower_http",
];

/// Dependencies that only speak up at `warn` unless `RUST_LOG` says otherwise.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Errors raised while setting up logging.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("unknown log level '{0}' (expected trace, debug, info, warn or error)")]
    UnknownLevel(String),

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for Cluster Claimer crates.
    pub level: Level,
    /// Emit one JSON object per line instead of human-readable text.
    pub json_format: bool,
    /// Log span open/close events (lease spans included).
    pub include_spans: bool,
    /// Include file and line of the call site.
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            include_spans: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Verbose text output for local runs.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            include_spans: true,
            include_location: true,
            ..Self::default()
        }
    }

    /// JSON output for log shippers.
    pub fn production() -> Self {
        Self {
            json_format: true,
            ..Self::default()
        }
    }

    /// Builds a configuration from a level name such as `"debug"` (any case).
    pub fn from_level_name(name: &str, json_format: bool) -> Result<Self, LoggingError> {
        let level = Level::from_str(name.trim())
            .map_err(|_| LoggingError::UnknownLevel(name.to_string()))?;
        Ok(Self {
            level,
            json_format,
            ..Self::default()
        })
    }

    /// Filter directive used when `RUST_LOG` is unset, e.g.
    /// `kc_core=info,...,hyper=warn,...`.
    pub fn default_directive(&self) -> String {
        let level = self.level.to_string().to_lowercase();
        CLAIMER_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .chain(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer = fmt::layer()
            .with_span_events(span_events)
            .with_file(self.include_location)
            .with_line_number(self.include_location);

        if self.json_format {
            layer.json().with_current_span(true).boxed()
        } else {
            layer.boxed()
        }
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn try_init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    tracing_subscriber::registry()
        .with(config.fmt_layer().with_filter(env_filter))
        .try_init()?;
    Ok(())
}

/// Opens an `info` span around one lease operation.
///
/// `cluster` and `token` start empty; record them once they are known.
///
/// ```ignore
/// let span = lease_span!("allocate", requested_secs = 600);
/// span.record("cluster", "CI-1");
/// ```
#[macro_export]
macro_rules! lease_span {
    ($operation:expr) => {
        ::tracing::info_span!(
            "lease",
            operation = $operation,
            cluster = ::tracing::field::Empty,
            token = ::tracing::field::Empty
        )
    };
    ($operation:expr, $($field:tt)*) => {
        ::tracing::info_span!(
            "lease",
            operation = $operation,
            cluster = ::tracing::field::Empty,
            token = ::tracing::field::Empty,
            $($field)*
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let dev = LoggingConfig::development();
        assert_eq!(dev.level, Level::DEBUG);
        assert!(dev.include_spans && !dev.json_format);

        let prod = LoggingConfig::production();
        assert_eq!(prod.level, Level::INFO);
        assert!(prod.json_format && !prod.include_location);
    }

    #[test]
    fn test_from_level_name() {
        let config = LoggingConfig::from_level_name(" WARN ", true).unwrap();
        assert_eq!(config.level, Level::WARN);
        assert!(config.json_format);

        assert!(matches!(
            LoggingConfig::from_level_name("loud", false),
            Err(LoggingError::UnknownLevel(name)) if name == "loud"
        ));
    }

    #[test]
    fn test_default_directive_quiets_http_clients() {
        let directive = LoggingConfig::development().default_directive();
        assert!(directive.starts_with(
            "kc_core=debug,kc_connectors=debug,kc_api=debug,cluster_claimer=debug,tower_http=debug"
        ));
        assert!(directive.contains("hyper=warn"));
        assert!(directive.contains("reqwest=warn"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn test_second_init_is_rejected() {
        // The first call may lose to another test's subscriber; the second never wins.
        let _ = try_init_logging(LoggingConfig::default());
        assert!(matches!(
            try_init_logging(LoggingConfig::default()),
            Err(LoggingError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn test_lease_span_records_fields() {
        let span = lease_span!("release", requested_secs = 60u64);
        span.record("cluster", "CI-1");
        span.record("token", "abc");
        let _entered = span.enter();
    }
}
