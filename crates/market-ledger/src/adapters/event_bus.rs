//! # Event Bus Adapter
//!
//! In-memory broadcast bus for ledger events, with a bounded history so late
//! observers can replay what they missed.

use crate::domain::value_objects::MarketId;
use crate::events::EventEnvelope;
use crate::ports::outbound::EventSink;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

/// Default broadcast buffer per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default number of envelopes kept for replay.
pub const DEFAULT_HISTORY_LIMIT: usize = 4096;

/// Selects which envelopes a subscriber receives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Topics to accept; `None` accepts all.
    pub topics: Option<Vec<&'static str>>,
    /// Market to accept; `None` accepts all.
    pub market_id: Option<MarketId>,
}

impl EventFilter {
    /// Accept everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept only the given topics.
    #[must_use]
    pub fn topics(topics: Vec<&'static str>) -> Self {
        Self {
            topics: Some(topics),
            market_id: None,
        }
    }

    /// Accept only events of one market.
    #[must_use]
    pub fn market(market_id: MarketId) -> Self {
        Self {
            topics: None,
            market_id: Some(market_id),
        }
    }

    /// Returns true if the envelope passes the filter.
    #[must_use]
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        let topic_ok = self
            .topics
            .as_ref()
            .map_or(true, |topics| topics.contains(&envelope.event.topic()));
        let market_ok = self
            .market_id
            .map_or(true, |id| envelope.event.market_id() == id);
        topic_ok && market_ok
    }
}

/// A filtered subscription.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<EventEnvelope>,
    filter: EventFilter,
}

impl Subscription {
    /// Receive the next matching envelope; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if self.filter.matches(&envelope) => return Some(envelope),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some events dropped");
                }
            }
        }
    }

    /// Receive without waiting; `None` if nothing matching is queued.
    pub fn try_recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) if self.filter.matches(&envelope) => return Some(envelope),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Convert into a stream of matching envelopes. Lagged gaps are skipped.
    pub fn into_stream(self) -> impl Stream<Item = EventEnvelope> {
        let filter = self.filter;
        BroadcastStream::new(self.receiver)
            .filter_map(|item| item.ok())
            .filter(move |envelope| filter.matches(envelope))
    }
}

/// In-memory event bus.
#[derive(Debug)]
pub struct InMemoryEventBus {
    sender: broadcast::Sender<EventEnvelope>,
    history: RwLock<VecDeque<EventEnvelope>>,
    history_limit: usize,
    events_published: AtomicU64,
}

impl InMemoryEventBus {
    /// Create a bus with default capacity and history.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CHANNEL_CAPACITY, DEFAULT_HISTORY_LIMIT)
    }

    /// Create a bus with explicit channel capacity and history length.
    #[must_use]
    pub fn with_limits(capacity: usize, history_limit: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            history: RwLock::new(VecDeque::new()),
            history_limit,
            events_published: AtomicU64::new(0),
        }
    }

    /// Subscribe to future envelopes matching `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(?filter, "New event subscription");
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    /// Replay retained envelopes matching `filter`, oldest first.
    #[must_use]
    pub fn history(&self, filter: &EventFilter) -> Vec<EventEnvelope> {
        self.history
            .read()
            .iter()
            .filter(|envelope| filter.matches(envelope))
            .cloned()
            .collect()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total envelopes ever published.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for InMemoryEventBus {
    async fn publish(&self, envelope: EventEnvelope) -> usize {
        {
            let mut history = self.history.write();
            if self.history_limit > 0 {
                if history.len() == self.history_limit {
                    history.pop_front();
                }
                history.push_back(envelope.clone());
            }
        }
        self.events_published.fetch_add(1, Ordering::Relaxed);

        // No subscribers is not an error
        self.sender.send(envelope).unwrap_or(0)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Address, Hash, U256};
    use crate::events::{topics, MarketEvent};
    use std::time::Duration;
    use tokio::time::timeout;

    fn envelope(market_id: MarketId, resolved: bool) -> EventEnvelope {
        let event = if resolved {
            MarketEvent::MarketResolved {
                market_id,
                outcome: true,
                total_yes: U256::one(),
                total_no: U256::zero(),
            }
        } else {
            MarketEvent::MarketCreated {
                market_id,
                creator: Address::repeat_byte(1),
                question: "q".to_string(),
                end_time: 10,
            }
        };
        EventEnvelope {
            tx_hash: Hash::new([market_id as u8; 32]),
            block_number: market_id,
            log_index: 0,
            event,
        }
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        let reached = bus.publish(envelope(0, false)).await;
        assert_eq!(reached, 1);

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(received, envelope(0, false));
    }

    #[tokio::test]
    async fn test_topic_filter() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::topics(vec![topics::MARKET_RESOLVED]));

        bus.publish(envelope(0, false)).await;
        bus.publish(envelope(0, true)).await;

        let received = sub.try_recv().expect("resolved event");
        assert_eq!(received.event.topic(), topics::MARKET_RESOLVED);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = InMemoryEventBus::new();
        assert_eq!(bus.publish(envelope(0, false)).await, 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let bus = InMemoryEventBus::with_limits(8, 2);
        for id in 0..3 {
            bus.publish(envelope(id, false)).await;
        }

        let history = bus.history(&EventFilter::all());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event.market_id(), 1);
        assert_eq!(bus.history(&EventFilter::market(2)).len(), 1);
    }

    #[tokio::test]
    async fn test_stream() {
        let bus = InMemoryEventBus::new();
        let stream = bus.subscribe(EventFilter::market(1)).into_stream();
        tokio::pin!(stream);

        bus.publish(envelope(0, false)).await;
        bus.publish(envelope(1, false)).await;

        let first = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(first.event.market_id(), 1);
    }
}
