//! # Staking Flows
//!
//! Full pool lifecycles through the simulated ledger:
//!
//! 1. **Worked example**: fund 1000, lock 5, book 100 at round 10, withdraw at 14 and 15
//! 2. **Status reporting** across the booking lifecycle
//! 3. **Close-out** forfeits the booking
//! 4. **Immutability**: update never allowed, delete by the creator only
//! 5. **Orchestrator end to end** with a background block producer

#[cfg(test)]
mod tests {
    use crate::fixtures::{fast_config, Devnet};
    use qs_01_staking_protocol::{
        invariant_capacity_conserved, Booking, OnCompletion, Rejection, StakingStatus,
    };
    use qs_02_group_orchestrator::{LedgerRejection, OrchestratorConfig, StakingApi};
    use std::time::Duration;

    // =============================================================================
    // WORKED EXAMPLE
    // =============================================================================

    #[tokio::test]
    async fn test_worked_example() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 1_000, 5).await;
        let alice = net.participant("creator", "alice", &pool, 500).await;

        // Booking commits in round 10
        net.advance_to(9);
        let receipt = net.book("alice", &pool, 100).await.unwrap();
        assert_eq!(receipt.round, 10);

        let instance = net.instance(pool.pool_id);
        assert_eq!(instance.pool.bookable_amount, 900);
        assert_eq!(instance.booking(&alice), Some(&Booking::new(100, 10)));

        // Round 14: still locked
        net.advance_to(13);
        let early = net.withdraw("alice", &pool, 200).await;
        assert_eq!(
            early,
            Err(LedgerRejection::Protocol(Rejection::StillLocked {
                unlock_round: 15,
                current_round: 14,
            }))
        );
        assert_eq!(net.balance(alice, pool.asset_id), Some(400));

        // Round 15: released
        net.advance_to(14);
        let receipt = net.withdraw("alice", &pool, 200).await.unwrap();
        assert_eq!(receipt.round, 15);

        let instance = net.instance(pool.pool_id);
        assert_eq!(instance.booking(&alice), Some(&Booking::EMPTY));
        assert_eq!(instance.pool.bookable_amount, 900, "capacity is not restored");
        assert_eq!(net.balance(alice, pool.asset_id), Some(600));
        assert_eq!(net.balance(pool.escrow(), pool.asset_id), Some(900));
    }

    #[tokio::test]
    async fn test_withdrawal_not_repeatable() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 1_000, 2).await;
        net.participant("creator", "alice", &pool, 500).await;

        net.book("alice", &pool, 100).await.unwrap();
        net.ledger.advance_rounds(2);
        net.withdraw("alice", &pool, 200).await.unwrap();

        assert_eq!(
            net.withdraw("alice", &pool, 200).await,
            Err(LedgerRejection::Protocol(Rejection::NoActiveBooking))
        );
    }

    #[tokio::test]
    async fn test_rebooking_after_withdrawal_uses_remaining_capacity() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 300, 1).await;
        net.participant("creator", "alice", &pool, 1_000).await;

        net.book("alice", &pool, 200).await.unwrap();
        net.ledger.advance_rounds(1);
        net.withdraw("alice", &pool, 400).await.unwrap();

        assert_eq!(
            net.book("alice", &pool, 200).await,
            Err(LedgerRejection::Protocol(Rejection::CapacityExceeded {
                requested: 200,
                available: 100,
            }))
        );
        net.book("alice", &pool, 100).await.unwrap();
        let bookable = net.instance(pool.pool_id).pool.bookable_amount;
        assert_eq!(bookable, 0);
        assert!(invariant_capacity_conserved(300, 200 + 100, bookable));
    }

    // =============================================================================
    // STATUS
    // =============================================================================

    #[tokio::test]
    async fn test_status_follows_booking_lifecycle() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 1_000, 5).await;
        let alice = net.participant("creator", "alice", &pool, 500).await;
        let observer = net.service("observer");

        let report = observer.status(alice, pool.pool_id).await.unwrap();
        assert_eq!(report.status, StakingStatus::NoActiveBooking);
        assert_eq!(report.unlock_round, None);

        net.advance_to(9);
        net.book("alice", &pool, 100).await.unwrap();
        net.advance_to(12);
        let report = observer.status(alice, pool.pool_id).await.unwrap();
        assert_eq!(
            report.status,
            StakingStatus::Locked {
                remaining_rounds: 3
            }
        );
        assert_eq!(report.unlock_round, Some(15));

        net.advance_to(15);
        let report = observer.status(alice, pool.pool_id).await.unwrap();
        assert_eq!(report.status, StakingStatus::ReadyToWithdraw);

        net.withdraw("alice", &pool, 200).await.unwrap();
        let report = observer.status(alice, pool.pool_id).await.unwrap();
        assert_eq!(report.status, StakingStatus::AlreadyWithdrawn);
        assert_eq!(report.status.to_string(), "Withdrawal already executed");
    }

    // =============================================================================
    // CLOSE-OUT AND IMMUTABILITY
    // =============================================================================

    #[tokio::test]
    async fn test_close_out_forfeits_booking() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 1_000, 5).await;
        let alice = net.participant("creator", "alice", &pool, 500).await;

        net.book("alice", &pool, 50).await.unwrap();
        net.leave("alice", &pool).await.unwrap();

        let instance = net.instance(pool.pool_id);
        assert!(!instance.is_registered(&alice));
        assert_eq!(instance.pool.bookable_amount, 950);
        assert_eq!(net.balance(pool.escrow(), pool.asset_id), Some(1_050));

        // Rejoining starts from an empty record
        net.join("alice", &pool).await.unwrap();
        assert_eq!(
            net.instance(pool.pool_id).booking(&alice),
            Some(&Booking::EMPTY)
        );
        net.ledger.advance_rounds(10);
        assert_eq!(
            net.withdraw("alice", &pool, 100).await,
            Err(LedgerRejection::Protocol(Rejection::NoActiveBooking))
        );
    }

    #[tokio::test]
    async fn test_update_never_allowed() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 1_000, 5).await;

        let update = net.group(vec![net.lifecycle(
            "creator",
            pool.pool_id,
            OnCompletion::UpdateApplication,
        )]);
        assert_eq!(
            net.commit(update).await,
            Err(LedgerRejection::Protocol(Rejection::UpdateRejected))
        );
    }

    #[tokio::test]
    async fn test_delete_by_creator_only() {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 1_000, 5).await;
        let mallory = net.account("mallory");

        let attempt = net.group(vec![net.lifecycle(
            "mallory",
            pool.pool_id,
            OnCompletion::DeleteApplication,
        )]);
        assert_eq!(
            net.commit(attempt).await,
            Err(LedgerRejection::Protocol(Rejection::DeleteUnauthorized {
                caller: mallory
            }))
        );

        let delete = net.group(vec![net.lifecycle(
            "creator",
            pool.pool_id,
            OnCompletion::DeleteApplication,
        )]);
        net.commit(delete).await.unwrap();
        assert!(!net.ledger.snapshot().pools.contains_key(&pool.pool_id));
    }

    // =============================================================================
    // ORCHESTRATOR END TO END
    // =============================================================================

    #[tokio::test]
    async fn test_orchestrated_lifecycle() {
        let net = Devnet::new();
        let producer = net.start_producer(Duration::from_millis(2));

        let creator = net.service("creator");
        let alice = net.service_with(
            "alice",
            OrchestratorConfig {
                wait_for_unlock: true,
                ..fast_config()
            },
        );
        let alice_address = alice.address().unwrap();

        let asset = creator.mint_asset(100_000, "STK").await.unwrap();
        alice.opt_in_asset(asset).await.unwrap();
        creator.send_asset(asset, alice_address, 1_000).await.unwrap();

        let summary = creator.create(asset, 4, 2_000).await.unwrap();
        assert_eq!(summary.bookable_amount, 2_000);
        assert_eq!(summary.escrow_balance, Some(2_000));

        alice.join(summary.pool_id).await.unwrap();
        let booking = alice.book(summary.pool_id, 300).await.unwrap();
        assert_eq!(booking.unlock_round, booking.round + 4);

        let receipt = alice.withdraw(summary.pool_id).await.unwrap();
        assert_eq!(receipt.payout, 600);
        assert!(receipt.round >= booking.unlock_round);

        let info = creator.info(summary.pool_id).await.unwrap();
        assert_eq!(info.bookable_amount, 1_700);
        assert_eq!(info.escrow_balance, Some(1_700));
        assert_eq!(net.balance(alice_address, asset), Some(1_300));

        producer.abort();
    }
}
