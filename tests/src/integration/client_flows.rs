//! # Client Flows
//!
//! Wallet sessions driving a devnet ledger end to end: network switching,
//! client-side validation, friendly error translation and event observation.

#[cfg(test)]
mod tests {
    use super::super::{funded_ledger, ALICE, BOB, CAROL, DAY};
    use market_client::adapters::DevnetProvider;
    use market_client::config::ClientConfig;
    use market_client::errors::{translate, ClientError};
    use market_client::session::MarketSession;
    use market_ledger::adapters::EventFilter;
    use market_ledger::domain::value_objects::{ether, milli_ether, Address, U256};
    use market_ledger::errors::ErrorKind;
    use market_ledger::events::MarketEvent;
    use market_ledger::ports::inbound::MarketLedgerApi;
    use market_ledger::service::{DevnetLedger, ServiceConfig};
    use market_runtime::{spawn_observer, Walkthrough, WalkthroughPlan};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    type Session = MarketSession<DevnetProvider<DevnetLedger>>;

    fn provider(ledger: &Arc<DevnetLedger>, account: Address) -> DevnetProvider<DevnetLedger> {
        DevnetProvider::new(
            Arc::clone(ledger),
            ClientConfig::default().network,
            vec![account],
        )
    }

    async fn session(ledger: &Arc<DevnetLedger>, account: Address) -> Session {
        MarketSession::connect(Arc::new(provider(ledger, account)), ClientConfig::default())
            .await
            .unwrap()
    }

    // =========================================================================
    // FULL LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_session_lifecycle_emits_events() {
        let ledger = funded_ledger(ServiceConfig::default());
        let mut events = ledger.events().subscribe(EventFilter::all());

        let alice = session(&ledger, ALICE).await;
        let bob = session(&ledger, BOB).await;

        let created = alice.create_market("Will it snow?", DAY).await.unwrap();
        let id = created.market_id.unwrap();
        alice.place_bet(id, true, ether(1)).await.unwrap();
        bob.place_bet(id, false, ether(1)).await.unwrap();

        ledger.clock().advance(DAY);
        alice.resolve_market(id, true).await.unwrap();

        let claimed = alice.claim_winnings(id).await.unwrap();
        assert_eq!(claimed.payout, Some(ether(2)));
        let lost = bob.claim_winnings(id).await.unwrap_err();
        assert!(matches!(lost, ClientError::Reverted { .. }));

        let mut topics = Vec::new();
        while let Some(envelope) = events.try_recv() {
            topics.push(envelope.event.topic());
            if let MarketEvent::MarketResolved {
                total_yes, total_no, ..
            } = envelope.event
            {
                assert_eq!((total_yes, total_no), (ether(1), ether(1)));
            }
        }
        assert_eq!(
            topics,
            vec![
                "markets.created",
                "markets.bet_placed",
                "markets.bet_placed",
                "markets.resolved",
                "markets.winnings_claimed",
            ]
        );
        assert_eq!(alice.balance().await.unwrap(), ether(101));
        assert_eq!(bob.balance().await.unwrap(), ether(99));
    }

    // =========================================================================
    // NETWORK
    // =========================================================================

    #[tokio::test]
    async fn test_connect_switches_known_network() {
        let ledger = funded_ledger(ServiceConfig::default());
        let wallet = Arc::new(provider(&ledger, ALICE).on_chain(1));

        MarketSession::connect(Arc::clone(&wallet), ClientConfig::default())
            .await
            .unwrap();

        assert_eq!(wallet.switch_requests(), 1);
        assert_eq!(wallet.add_requests(), 0);
    }

    #[tokio::test]
    async fn test_connect_adds_unknown_network_then_switches() {
        let ledger = funded_ledger(ServiceConfig::default());
        let target = ClientConfig::default().network.chain_id;
        let wallet = Arc::new(provider(&ledger, ALICE).on_chain(1).forget_chain(target));

        let session = MarketSession::connect(Arc::clone(&wallet), ClientConfig::default())
            .await
            .unwrap();

        assert_eq!(wallet.add_requests(), 1);
        assert_eq!(wallet.switch_requests(), 2);
        assert!(wallet.knows_chain(target));
        assert_eq!(session.account(), ALICE);
    }

    #[tokio::test]
    async fn test_connect_without_accounts() {
        let ledger = funded_ledger(ServiceConfig::default());
        let wallet = Arc::new(DevnetProvider::new(
            Arc::clone(&ledger),
            ClientConfig::default().network,
            Vec::new(),
        ));

        let err = MarketSession::connect(wallet, ClientConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
    }

    // =========================================================================
    // VALIDATION AND ERRORS
    // =========================================================================

    #[tokio::test]
    async fn test_client_validation_submits_nothing() {
        let ledger = funded_ledger(ServiceConfig::default());
        let alice = session(&ledger, ALICE).await;

        assert!(matches!(
            alice.create_market("   ", DAY).await,
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            alice.create_market("q", 0).await,
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            alice.place_bet(0, true, U256::from(1u64)).await,
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            alice.place_bet(0, true, ether(11)).await,
            Err(ClientError::Validation(_))
        ));

        assert_eq!(ledger.stats().await.transactions_executed, 0);
    }

    #[tokio::test]
    async fn test_reverts_are_translated() {
        let ledger = funded_ledger(ServiceConfig::default());
        let alice = session(&ledger, ALICE).await;
        let bob = session(&ledger, BOB).await;
        let id = alice.create_market("q", DAY).await.unwrap().market_id.unwrap();
        ledger.clock().advance(DAY);

        match bob.resolve_market(id, true).await {
            Err(ClientError::Reverted { message, kind, .. }) => {
                assert_eq!(message, "Only the market creator can resolve this market");
                assert_eq!(kind, Some(ErrorKind::Authorization));
            }
            other => panic!("expected revert, got {other:?}"),
        }

        let err = bob.place_bet(id, true, milli_ether(10)).await.unwrap_err();
        assert_eq!(err.to_string(), "Betting on this market has closed");

        assert_eq!(translate("gas price too low"), "gas price too low");
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let ledger = funded_ledger(ServiceConfig::default());
        let wallet = Arc::new(provider(&ledger, CAROL));
        let carol = MarketSession::connect(Arc::clone(&wallet), ClientConfig::default())
            .await
            .unwrap();

        wallet.reject_next_request();
        assert!(matches!(
            carol.create_market("q", DAY).await,
            Err(ClientError::Rejected)
        ));
        assert_eq!(ledger.total_markets().await.unwrap(), 0);

        carol.create_market("q", DAY).await.unwrap();
        assert_eq!(ledger.total_markets().await.unwrap(), 1);
    }

    // =========================================================================
    // RUNTIME
    // =========================================================================

    #[tokio::test]
    async fn test_walkthrough_with_observer() {
        let plan = WalkthroughPlan::default();
        let ledger = funded_ledger(ServiceConfig::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let observer = spawn_observer(ledger.events().subscribe(EventFilter::all()), shutdown_rx);

        let report = Walkthrough::new(Arc::clone(&ledger), ClientConfig::default())
            .run(&plan)
            .await
            .unwrap();
        shutdown_tx.send(true).unwrap();
        let summary = tokio::time::timeout(Duration::from_secs(1), observer)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.markets_created, 1);
        assert_eq!(summary.bets_placed, 3);
        assert_eq!(summary.claims, 2);
        assert_eq!(summary.paid_out, ether(5));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["escrow_balance"], "0.0");
        assert_eq!(json["bettors"][1]["claim_error"], translate("No winnings to claim"));
    }
}
