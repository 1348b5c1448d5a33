//! # Concurrency
//!
//! Bookings racing for the same record or the same capacity. The ledger
//! evaluates pending groups in order within a block, so the first one wins and
//! every loser is rejected as a whole.

#[cfg(test)]
mod tests {
    use crate::fixtures::Devnet;
    use parking_lot::Mutex;
    use qs_01_staking_protocol::{invariant_capacity_conserved, Rejection};
    use qs_02_group_orchestrator::{
        ConfirmationStatus, LedgerRejection, OrchestratorError, StakingApi,
    };
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_round_double_booking() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 1_000, 5).await;
        let alice = net.participant("creator", "alice", &pool, 500).await;

        // Both pass the dry run against committed state.
        let first = net.submit(net.booking_group("alice", &pool, 50)).await.unwrap();
        let second = net.submit(net.booking_group("alice", &pool, 60)).await.unwrap();
        assert_eq!(net.ledger.pending_groups(), 2);

        let block = net.ledger.produce_block();
        assert_eq!(block.committed, 1);
        assert_eq!(block.rejected, 1);

        assert!(matches!(
            net.outcome(first).await,
            ConfirmationStatus::Committed(_)
        ));
        assert_eq!(
            net.outcome(second).await,
            ConfirmationStatus::Rejected(LedgerRejection::Protocol(Rejection::AlreadyBooked {
                booking_round: block.round,
            }))
        );

        // The losing deposit never moved.
        assert_eq!(net.balance(alice, pool.asset_id), Some(450));
        assert_eq!(net.instance(pool.pool_id).pool.bookable_amount, 950);
    }

    #[tokio::test]
    async fn test_orchestrated_double_booking() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 1_000, 5).await;
        net.participant("creator", "alice", &pool, 500).await;
        let producer = net.start_producer(Duration::from_millis(5));

        let a = net.service("alice");
        let b = net.service("alice");
        let (first, second) = tokio::join!(a.book(pool.pool_id, 50), b.book(pool.pool_id, 60));

        let outcomes = [first, second];
        let accepted = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(accepted, 1);
        for outcome in outcomes.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(
                    outcome.protocol_rejection(),
                    Some(Rejection::AlreadyBooked { .. })
                ),
                "unexpected error: {}",
                outcome
            );
        }
        producer.abort();
    }

    #[tokio::test]
    async fn test_capacity_race_between_participants() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 100, 5).await;
        net.participant("creator", "alice", &pool, 500).await;
        net.participant("creator", "bob", &pool, 500).await;

        let alice = net.submit(net.booking_group("alice", &pool, 80)).await.unwrap();
        let bob = net.submit(net.booking_group("bob", &pool, 80)).await.unwrap();
        net.ledger.produce_block();

        assert!(matches!(
            net.outcome(alice).await,
            ConfirmationStatus::Committed(_)
        ));
        assert_eq!(
            net.outcome(bob).await,
            ConfirmationStatus::Rejected(LedgerRejection::Protocol(Rejection::CapacityExceeded {
                requested: 80,
                available: 20,
            }))
        );
    }

    #[tokio::test]
    async fn test_parallel_participants_conserve_capacity() {
        const PARTICIPANTS: u64 = 8;

        let net = Arc::new(Devnet::new());
        let pool = net.staking_pool("creator", 10_000, 3).await;
        for i in 0..PARTICIPANTS {
            net.participant("creator", &format!("p{}", i), &pool, 1_000)
                .await;
        }
        let producer = net.start_producer(Duration::from_millis(2));

        let results = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = Vec::new();
        for i in 0..PARTICIPANTS {
            let net = Arc::clone(&net);
            let results = Arc::clone(&results);
            tasks.push(tokio::spawn(async move {
                let service = net.service(&format!("p{}", i));
                let amount = 100 + i * 10;
                let outcome = service.book(pool.pool_id, amount).await;
                results.lock().push((amount, outcome.map(|receipt| receipt.amount)));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        producer.abort();

        let results = results.lock();
        assert_eq!(results.len(), PARTICIPANTS as usize);
        let booked: u64 = results
            .iter()
            .map(|(amount, outcome)| {
                assert_eq!(outcome.as_ref().ok(), Some(amount));
                *amount
            })
            .sum();

        let instance = net.instance(pool.pool_id);
        assert_eq!(instance.active_bookings(), PARTICIPANTS as usize);
        assert!(invariant_capacity_conserved(
            10_000,
            u128::from(booked),
            instance.pool.bookable_amount
        ));
    }

    #[tokio::test]
    async fn test_orchestrator_reports_rejection_category() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 1_000, 50).await;
        net.participant("creator", "alice", &pool, 500).await;
        let producer = net.start_producer(Duration::from_millis(2));

        let alice = net.service("alice");
        alice.book(pool.pool_id, 10).await.unwrap();
        let err = alice.withdraw(pool.pool_id).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Rejected(LedgerRejection::Protocol(Rejection::StillLocked { .. }))
        ));
        producer.abort();
    }
}
