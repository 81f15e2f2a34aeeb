//! # Ledger Lifecycle
//!
//! Market lifecycle properties checked directly against the ledger API:
//! one resolution per market, one bet per address, claim rules, creator-only
//! resolution, atomic rejection of bad bets and aggregate-only reads.

#[cfg(test)]
mod tests {
    use super::super::{funded_ledger, ALICE, BOB, CAROL, DAY};
    use market_ledger::adapters::EventFilter;
    use market_ledger::domain::entities::MarketStatus;
    use market_ledger::domain::value_objects::{ether, milli_ether, Address, U256};
    use market_ledger::errors::{AclError, ErrorKind, LedgerError};
    use market_ledger::events::topics;
    use market_ledger::ports::inbound::{LedgerCall, MarketLedgerApi, Transaction};
    use market_ledger::ports::outbound::ConfidentialCompute;
    use market_ledger::service::{create_devnet_service, ServiceConfig, DEVNET_GENESIS_TIME};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // =========================================================================
    // SCENARIOS
    // =========================================================================

    #[tokio::test]
    async fn test_one_day_market_claims_once() {
        let ledger = funded_ledger(ServiceConfig::default());
        let id = ledger
            .create_market(ALICE, "Will it rain tomorrow?".to_string(), DAY)
            .await
            .unwrap();

        ledger.place_bet(BOB, id, true, milli_ether(10)).await.unwrap();
        ledger.clock().advance(DAY + 1);
        ledger.resolve_market(ALICE, id, true).await.unwrap();

        // Sole bettor on the winning side gets the stake back.
        assert_eq!(ledger.claim_winnings(BOB, id).await, Ok(milli_ether(10)));
        assert_eq!(
            ledger.claim_winnings(BOB, id).await,
            Err(LedgerError::AlreadyClaimed)
        );
        assert_eq!(ledger.balance_of(BOB).await.unwrap(), ether(100));
    }

    #[tokio::test]
    async fn test_stake_below_minimum_changes_nothing() {
        let ledger = funded_ledger(ServiceConfig::default());
        let id = ledger
            .create_market(ALICE, "q".to_string(), DAY)
            .await
            .unwrap();
        let published = ledger.events().events_published();

        let err = ledger
            .place_bet(BOB, id, true, U256::from(1_000u64))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::StakeOutOfRange { .. }));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(ledger.balance_of(BOB).await.unwrap(), ether(100));
        assert_eq!(
            ledger.balance_of(ledger.contract_address()).await.unwrap(),
            U256::zero()
        );
        assert!(ledger.get_bet(id, BOB).await.unwrap().is_none());
        let view = ledger.get_market(id).await.unwrap();
        assert_eq!(view.total_yes, U256::zero());
        assert_eq!(view.total_no, U256::zero());
        assert_eq!(ledger.events().events_published(), published);
    }

    #[tokio::test]
    async fn test_opposite_bets_expose_only_totals() {
        let ledger = funded_ledger(ServiceConfig::default());
        let id = ledger
            .create_market(CAROL, "q".to_string(), DAY)
            .await
            .unwrap();

        ledger.place_bet(ALICE, id, true, ether(1)).await.unwrap();
        ledger.place_bet(BOB, id, false, ether(2)).await.unwrap();

        let view = ledger.get_market(id).await.unwrap();
        assert_eq!(view.total_yes, ether(1));
        assert_eq!(view.total_no, ether(2));

        // Handles only, and only the owner (and the ledger) may unseal them.
        let alice_bet = ledger.get_bet(id, ALICE).await.unwrap().unwrap();
        let backend = ledger.confidential();
        assert!(matches!(
            backend.unseal_bool(alice_bet.prediction_handle, BOB),
            Err(AclError::NotAllowed { .. })
        ));
        assert!(matches!(
            backend.unseal_amount(alice_bet.stake_handle, CAROL),
            Err(AclError::NotAllowed { .. })
        ));
        assert_eq!(backend.unseal_bool(alice_bet.prediction_handle, ALICE), Ok(true));

        let revealed = ledger.reveal_bet(id, BOB).await.unwrap();
        assert!(!revealed.prediction);
        assert_eq!(revealed.stake, ether(2));
    }

    // =========================================================================
    // LIFECYCLE RULES
    // =========================================================================

    #[tokio::test]
    async fn test_market_resolves_at_most_once() {
        let ledger = funded_ledger(ServiceConfig::default());
        let id = ledger
            .create_market(ALICE, "q".to_string(), DAY)
            .await
            .unwrap();
        ledger.clock().advance(DAY);

        ledger.resolve_market(ALICE, id, false).await.unwrap();
        assert_eq!(
            ledger.resolve_market(ALICE, id, true).await,
            Err(LedgerError::AlreadyResolved)
        );

        let view = ledger.get_market(id).await.unwrap();
        assert_eq!(view.outcome, Some(false));
        assert_eq!(view.status, MarketStatus::Resolved);
        let resolutions = ledger
            .events()
            .history(&EventFilter::topics(vec![topics::MARKET_RESOLVED]));
        assert_eq!(resolutions.len(), 1);
    }

    #[tokio::test]
    async fn test_one_bet_per_address() {
        let ledger = funded_ledger(ServiceConfig::default());
        let id = ledger
            .create_market(ALICE, "q".to_string(), DAY)
            .await
            .unwrap();

        ledger.place_bet(BOB, id, true, ether(1)).await.unwrap();
        assert_eq!(
            ledger.place_bet(BOB, id, false, ether(1)).await,
            Err(LedgerError::DuplicateBet)
        );
        assert_eq!(ledger.get_market(id).await.unwrap().total_no, U256::zero());
        assert_eq!(ledger.balance_of(BOB).await.unwrap(), ether(99));
    }

    #[tokio::test]
    async fn test_resolution_and_claim_guards() {
        let ledger = funded_ledger(ServiceConfig::default());
        let id = ledger
            .create_market(ALICE, "q".to_string(), DAY)
            .await
            .unwrap();
        ledger.place_bet(BOB, id, true, ether(1)).await.unwrap();

        assert_eq!(
            ledger.claim_winnings(BOB, id).await,
            Err(LedgerError::MarketNotResolved)
        );
        assert_eq!(
            ledger.resolve_market(ALICE, id, true).await,
            Err(LedgerError::MarketNotEnded)
        );

        ledger.clock().advance(DAY);
        let err = ledger.resolve_market(BOB, id, true).await.unwrap_err();
        assert_eq!(err, LedgerError::NotCreator);
        assert_eq!(err.kind(), ErrorKind::Authorization);

        ledger.resolve_market(ALICE, id, true).await.unwrap();
        assert_eq!(
            ledger.claim_winnings(CAROL, id).await,
            Err(LedgerError::NoBet)
        );
    }

    #[tokio::test]
    async fn test_reverted_transaction_leaves_no_trace() {
        let ledger = funded_ledger(ServiceConfig::default());
        let published = ledger.events().events_published();

        let receipt = ledger
            .execute(Transaction {
                from: ALICE,
                to: Address::repeat_byte(0x99),
                value: U256::zero(),
                nonce: 0,
                call: LedgerCall::CreateMarket {
                    question: "q".to_string(),
                    duration: DAY,
                },
            })
            .await
            .unwrap();

        assert!(!receipt.success);
        assert!(receipt.events.is_empty());
        assert_eq!(receipt.error_kind, Some(ErrorKind::Validation));
        assert_eq!(ledger.total_markets().await.unwrap(), 0);
        assert_eq!(ledger.balance_of(ALICE).await.unwrap(), ether(100));
        assert_eq!(ledger.events().events_published(), published);
    }

    // =========================================================================
    // RANDOMIZED ACCOUNTING
    // =========================================================================

    #[tokio::test]
    async fn test_random_markets_conserve_value() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let bettors: Vec<Address> = (1..=12u8).map(Address::repeat_byte).collect();
        let ledger = create_devnet_service(
            ServiceConfig::default(),
            bettors.iter().map(|b| (*b, ether(50))),
            DEVNET_GENESIS_TIME,
        );
        let contract = ledger.contract_address();

        for round in 0..5u64 {
            let creator = bettors[0];
            let id = ledger
                .create_market(creator, format!("round {round}"), DAY)
                .await
                .unwrap();

            let mut bets = Vec::new();
            for bettor in &bettors {
                if !rng.gen_bool(0.7) {
                    continue;
                }
                let prediction = rng.gen_bool(0.5);
                let stake = milli_ether(rng.gen_range(1..=10_000u64));
                ledger.place_bet(*bettor, id, prediction, stake).await.unwrap();
                bets.push((*bettor, prediction, stake));
            }

            let (yes, no) = bets.iter().fold((U256::zero(), U256::zero()), |(y, n), b| {
                if b.1 {
                    (y + b.2, n)
                } else {
                    (y, n + b.2)
                }
            });
            let view = ledger.get_market(id).await.unwrap();
            assert_eq!((view.total_yes, view.total_no), (yes, no));

            let escrow_before = ledger.balance_of(contract).await.unwrap();
            ledger.clock().advance(DAY);
            let outcome = rng.gen_bool(0.5);
            ledger.resolve_market(creator, id, outcome).await.unwrap();

            let (winning, losing) = if outcome { (yes, no) } else { (no, yes) };
            let mut paid = U256::zero();
            for (bettor, prediction, stake) in &bets {
                let result = ledger.claim_winnings(*bettor, id).await;
                if *prediction == outcome {
                    let expected = *stake + *stake * losing / winning;
                    assert_eq!(result, Ok(expected));
                    paid = paid + expected;
                } else {
                    assert_eq!(result, Err(LedgerError::NoWinnings));
                }
            }

            assert!(paid <= yes + no);
            assert_eq!(
                ledger.balance_of(contract).await.unwrap(),
                escrow_before - paid
            );
        }
    }
}
