//! Prometheus metrics for sealed markets.
//!
//! All metrics follow the naming convention: `sm_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LEDGER METRICS
    // =========================================================================

    /// Markets created
    pub static ref MARKETS_CREATED: Counter = Counter::new(
        "sm_ledger_markets_created_total",
        "Total number of markets created"
    ).expect("metric creation failed");

    /// Bets placed
    pub static ref BETS_PLACED: Counter = Counter::new(
        "sm_ledger_bets_placed_total",
        "Total number of sealed bets placed"
    ).expect("metric creation failed");

    /// Markets resolved, by outcome
    pub static ref MARKETS_RESOLVED: CounterVec = CounterVec::new(
        Opts::new("sm_ledger_markets_resolved_total", "Total markets resolved"),
        &["outcome"]  // yes / no
    ).expect("metric creation failed");

    /// Winnings claims paid
    pub static ref WINNINGS_CLAIMED: Counter = Counter::new(
        "sm_ledger_winnings_claimed_total",
        "Total number of successful winnings claims"
    ).expect("metric creation failed");

    /// Ether paid out
    pub static ref PAYOUT_VOLUME: Counter = Counter::new(
        "sm_ledger_payout_ether_total",
        "Total ether paid out of escrow"
    ).expect("metric creation failed");

    /// Markets not yet resolved
    pub static ref OPEN_MARKETS: Gauge = Gauge::new(
        "sm_ledger_unresolved_markets",
        "Number of markets created but not yet resolved"
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSACTION METRICS
    // =========================================================================

    /// Transactions by entry point and outcome
    pub static ref TRANSACTIONS: CounterVec = CounterVec::new(
        Opts::new("sm_tx_total", "Transactions submitted through the client"),
        &["call", "outcome"]  // outcome: confirmed / reverted / rejected / failed
    ).expect("metric creation failed");

    /// Time from submission to receipt
    pub static ref TX_CONFIRMATION_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "sm_tx_confirmation_duration_seconds",
            "Time from submission to receipt"
        ).buckets(exponential_buckets(0.0005, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS METRICS
    // =========================================================================

    /// Ledger events observed, by topic
    pub static ref EVENTS_OBSERVED: CounterVec = CounterVec::new(
        Opts::new("sm_events_observed_total", "Ledger events seen by observers"),
        &["topic"]
    ).expect("metric creation failed");
}

/// Handle proving metrics were registered.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    registry: Registry,
}

impl MetricsHandle {
    /// The registry metrics were registered with.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the global registry. Calling it again is a
/// no-op.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ledger
        Box::new(MARKETS_CREATED.clone()),
        Box::new(BETS_PLACED.clone()),
        Box::new(MARKETS_RESOLVED.clone()),
        Box::new(WINNINGS_CLAIMED.clone()),
        Box::new(PAYOUT_VOLUME.clone()),
        Box::new(OPEN_MARKETS.clone()),
        // Transactions
        Box::new(TRANSACTIONS.clone()),
        Box::new(TX_CONFIRMATION_DURATION.clone()),
        // Event bus
        Box::new(EVENTS_OBSERVED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: REGISTRY.clone(),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
