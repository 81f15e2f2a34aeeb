//! # Market Telemetry
//!
//! Ambient observability for the sealed-markets workspace: a `tracing`
//! subscriber (pretty or JSON, filtered by `EnvFilter`), structured logging
//! macros, and Prometheus metrics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use market_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::for_component("runtime"))?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SM_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `SM_JSON_LOGS` | `false` | JSON log lines |
//! | `SM_CONSOLE_OUTPUT` | `true` | Write logs to the console |
//! | `SM_METRICS` | `true` | Register Prometheus metrics |
//! | `SM_SERVICE_NAME` | `sealed-markets` | Service name in logs |
//! | `SM_NETWORK` | `devnet` | Network label |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, BETS_PLACED, EVENTS_OBSERVED,
    MARKETS_CREATED, MARKETS_RESOLVED, OPEN_MARKETS, PAYOUT_VOLUME, TRANSACTIONS,
    TX_CONFIRMATION_DURATION, WINNINGS_CLAIMED,
};
pub use tracing_setup::{build_filter, init_tracing};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    /// Metric registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard to hold for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = if config.metrics_enabled {
        Some(register_metrics()?)
    } else {
        None
    };

    tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard { config, metrics })
}

/// Guard that keeps telemetry active.
#[derive(Debug)]
pub struct TelemetryGuard {
    config: TelemetryConfig,
    metrics: Option<MetricsHandle>,
}

impl TelemetryGuard {
    /// Configuration telemetry was started with.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Metrics handle, if metrics are enabled.
    pub fn metrics(&self) -> Option<&MetricsHandle> {
        self.metrics.as_ref()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.config.full_service_name(), "Shutting down telemetry");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_macros() {
        metric_inc!(MARKETS_CREATED);
        metric_inc!(TRANSACTIONS, &["createMarket", "confirmed"]);
        metric_observe!(TX_CONFIRMATION_DURATION, 0.01);
        assert!(MARKETS_CREATED.get() >= 1.0);
    }
}
