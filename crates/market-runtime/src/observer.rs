//! # Metrics Observer
//!
//! Consumes the ledger event stream and feeds the Prometheus counters. The
//! ledger itself knows nothing about metrics; everything here is derived
//! from committed events.

use market_client::units::format_ether;
use market_ledger::adapters::Subscription;
use market_ledger::events::{EventEnvelope, MarketEvent};
use market_ledger::domain::value_objects::U256;
use market_telemetry::{
    log_market_event, BETS_PLACED, EVENTS_OBSERVED, MARKETS_CREATED, MARKETS_RESOLVED,
    OPEN_MARKETS, PAYOUT_VOLUME, WINNINGS_CLAIMED,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::info;

const COMPONENT: &str = "observer";

/// Totals seen by one observer.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ObserverSummary {
    /// Envelopes consumed.
    pub events: u64,
    /// `MarketCreated` events.
    pub markets_created: u64,
    /// `BetPlaced` events.
    pub bets_placed: u64,
    /// `MarketResolved` events.
    pub markets_resolved: u64,
    /// `WinningsClaimed` events.
    pub claims: u64,
    /// Sum of claimed payouts in wei.
    pub paid_out: U256,
}

impl ObserverSummary {
    /// Account for one envelope and update the global metrics.
    pub fn record(&mut self, envelope: &EventEnvelope) {
        self.events += 1;
        EVENTS_OBSERVED
            .with_label_values(&[envelope.event.topic()])
            .inc();

        match &envelope.event {
            MarketEvent::MarketCreated { market_id, .. } => {
                self.markets_created += 1;
                MARKETS_CREATED.inc();
                OPEN_MARKETS.inc();
                log_market_event!(debug, COMPONENT, "Market created", *market_id);
            }
            MarketEvent::BetPlaced { market_id, .. } => {
                self.bets_placed += 1;
                BETS_PLACED.inc();
                log_market_event!(debug, COMPONENT, "Bet placed", *market_id);
            }
            MarketEvent::MarketResolved {
                market_id, outcome, ..
            } => {
                self.markets_resolved += 1;
                MARKETS_RESOLVED
                    .with_label_values(&[if *outcome { "yes" } else { "no" }])
                    .inc();
                OPEN_MARKETS.dec();
                log_market_event!(debug, COMPONENT, "Market resolved", *market_id, outcome = *outcome);
            }
            MarketEvent::WinningsClaimed {
                market_id, payout, ..
            } => {
                self.claims += 1;
                self.paid_out = self.paid_out.saturating_add(*payout);
                WINNINGS_CLAIMED.inc();
                PAYOUT_VOLUME.inc_by(ether_f64(*payout));
                log_market_event!(debug, COMPONENT, "Winnings claimed", *market_id, payout = %format_ether(*payout));
            }
        }
    }
}

/// Approximate ether value for gauges and counters.
fn ether_f64(wei: U256) -> f64 {
    format_ether(wei).parse().unwrap_or(0.0)
}

/// Spawn an observer task over `subscription`.
///
/// The task runs until the bus closes or `shutdown` flips, then returns what
/// it saw. Envelopes already queued when `shutdown` flips are still counted.
pub fn spawn_observer(
    subscription: Subscription,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<ObserverSummary> {
    tokio::spawn(async move {
        let mut summary = ObserverSummary::default();
        let stream = subscription.into_stream();
        tokio::pin!(stream);

        loop {
            tokio::select! {
                biased;
                next = stream.next() => match next {
                    Some(envelope) => summary.record(&envelope),
                    None => break,
                },
                _ = shutdown.changed() => {
                    info!(component = COMPONENT, "Shutdown signal received");
                    break;
                }
            }
        }

        summary
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use market_ledger::adapters::{EventFilter, InMemoryEventBus};
    use market_ledger::domain::value_objects::{ether, Address, CiphertextHandle, Hash, SealedKind};
    use market_ledger::ports::outbound::EventSink;
    use std::time::Duration;

    fn envelope(event: MarketEvent) -> EventEnvelope {
        EventEnvelope {
            tx_hash: Hash::new([7u8; 32]),
            block_number: 1,
            log_index: 0,
            event,
        }
    }

    #[test]
    fn test_summary_counts_each_kind() {
        let mut summary = ObserverSummary::default();
        summary.record(&envelope(MarketEvent::MarketCreated {
            market_id: 0,
            creator: Address::repeat_byte(1),
            question: "q".to_string(),
            end_time: 10,
        }));
        summary.record(&envelope(MarketEvent::MarketResolved {
            market_id: 0,
            outcome: false,
            total_yes: U256::zero(),
            total_no: ether(1),
        }));
        summary.record(&envelope(MarketEvent::WinningsClaimed {
            market_id: 0,
            bettor: Address::repeat_byte(2),
            payout: ether(2),
        }));

        assert_eq!(summary.events, 3);
        assert_eq!(summary.markets_created, 1);
        assert_eq!(summary.markets_resolved, 1);
        assert_eq!(summary.claims, 1);
        assert_eq!(summary.paid_out, ether(2));
    }

    #[test]
    fn test_ether_f64() {
        assert!((ether_f64(ether(3)) - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_observer_stops_on_shutdown() {
        let bus = InMemoryEventBus::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_observer(bus.subscribe(EventFilter::all()), shutdown_rx);

        bus.publish(envelope(MarketEvent::BetPlaced {
            market_id: 0,
            bettor: Address::repeat_byte(3),
            stake_handle: CiphertextHandle::new(Hash::new([1u8; 32]), SealedKind::Amount),
            prediction_handle: CiphertextHandle::new(Hash::new([2u8; 32]), SealedKind::Bool),
        }))
        .await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();

        let summary = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("observer did not stop")
            .expect("observer panicked");
        assert_eq!(summary.bets_placed, 1);
    }
}
