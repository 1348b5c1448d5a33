//! # Escrow Drain Attempts
//!
//! Groups that try to move funds out of the escrow without a matching,
//! unlocked booking. The escrow rule and the pool program each refuse their
//! share; the escrow balance never changes.

#[cfg(test)]
mod tests {
    use crate::fixtures::{Devnet, Leg, StakingPool};
    use qs_01_staking_protocol::{
        AssetTransfer, Authorizer, CallAction, EscrowRejection, EscrowRule, OnCompletion, Operation,
        OperationKind, Rejection,
    };
    use qs_02_group_orchestrator::{LedgerRejection, LegSigner};
    use shared_types::{Address, PoolId};

    /// Pool funded with 1000, lock 2, alice booked 100 and unlocked.
    async fn unlocked_booking() -> (Devnet, StakingPool) {
        let net = Devnet::new();
        let pool = net.staking_pool("creator", 1_000, 2).await;
        net.participant("creator", "alice", &pool, 500).await;
        net.participant("creator", "mallory", &pool, 500).await;
        net.book("alice", &pool, 100).await.unwrap();
        net.ledger.advance_rounds(2);
        (net, pool)
    }

    fn escrow_leg(rule: EscrowRule, transfer: AssetTransfer, fee: u64) -> Leg {
        let op = Operation::new(rule.address(), OperationKind::AssetTransfer(transfer)).with_fee(fee);
        (op, LegSigner::Escrow(rule))
    }

    fn release(pool: &StakingPool, receiver: Address, amount: u64) -> AssetTransfer {
        AssetTransfer {
            asset_id: pool.asset_id,
            receiver,
            amount,
            close_to: None,
        }
    }

    fn assert_escrow_untouched(net: &Devnet, pool: &StakingPool) {
        assert_eq!(net.balance(pool.escrow(), pool.asset_id), Some(1_100));
    }

    #[tokio::test]
    async fn test_lone_escrow_transfer_refused() {
        let (net, pool) = unlocked_booking().await;
        let mallory = net.account("mallory");

        let group = net.forge(vec![net.escrow_transfer(pool.rule, mallory, 500)]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Escrow {
                index: 0,
                reason: EscrowRejection::NotOptIn,
            })
        );
        assert_escrow_untouched(&net, &pool);
    }

    #[tokio::test]
    async fn test_release_behind_booking_call_refused() {
        let (net, pool) = unlocked_booking().await;
        let mallory = net.account("mallory");

        let group = net.forge(vec![
            net.call("mallory", pool.pool_id, CallAction::Booking),
            net.escrow_transfer(pool.rule, mallory, 100),
        ]);
        assert!(matches!(
            net.commit(group).await,
            Err(LedgerRejection::Protocol(Rejection::InvalidBooking { .. }))
        ));
        assert_escrow_untouched(&net, &pool);
    }

    #[tokio::test]
    async fn test_overpaid_withdrawal_refused() {
        let (net, pool) = unlocked_booking().await;
        let alice = net.account("alice");

        let group = net.forge(vec![
            net.call("alice", pool.pool_id, CallAction::Withdrawal),
            net.escrow_transfer(pool.rule, alice, 1_000),
        ]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Protocol(Rejection::AmountMismatch {
                expected: 200,
                actual: 1_000,
            }))
        );
        assert_escrow_untouched(&net, &pool);
    }

    #[tokio::test]
    async fn test_release_to_third_party_refused() {
        let (net, pool) = unlocked_booking().await;
        let mallory = net.account("mallory");

        let group = net.forge(vec![
            net.call("alice", pool.pool_id, CallAction::Withdrawal),
            net.escrow_transfer(pool.rule, mallory, 200),
        ]);
        assert!(matches!(
            net.commit(group).await,
            Err(LedgerRejection::Protocol(Rejection::InvalidWithdrawal { .. }))
        ));
        assert_escrow_untouched(&net, &pool);
    }

    #[tokio::test]
    async fn test_withdrawal_by_non_booker_refused() {
        let (net, pool) = unlocked_booking().await;
        let mallory = net.account("mallory");

        let group = net.forge(vec![
            net.call("mallory", pool.pool_id, CallAction::Withdrawal),
            net.escrow_transfer(pool.rule, mallory, 200),
        ]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Protocol(Rejection::NoActiveBooking))
        );
        assert_escrow_untouched(&net, &pool);
    }

    #[tokio::test]
    async fn test_close_to_sweep_refused() {
        let (net, pool) = unlocked_booking().await;
        let alice = net.account("alice");
        let mallory = net.account("mallory");

        let sweep = AssetTransfer {
            close_to: Some(mallory),
            ..release(&pool, alice, 200)
        };
        let group = net.forge(vec![
            net.call("alice", pool.pool_id, CallAction::Withdrawal),
            escrow_leg(pool.rule, sweep, 1),
        ]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Escrow {
                index: 1,
                reason: EscrowRejection::CloseToForbidden,
            })
        );
        assert_escrow_untouched(&net, &pool);
    }

    #[tokio::test]
    async fn test_rekey_refused() {
        let (net, pool) = unlocked_booking().await;
        let alice = net.account("alice");
        let mallory = net.account("mallory");

        let (op, signer) = escrow_leg(pool.rule, release(&pool, alice, 200), 1);
        let group = net.forge(vec![
            net.call("alice", pool.pool_id, CallAction::Withdrawal),
            (op.with_rekey(mallory), signer),
        ]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Escrow {
                index: 1,
                reason: EscrowRejection::RekeyForbidden,
            })
        );
    }

    #[tokio::test]
    async fn test_fee_drain_refused() {
        let (net, pool) = unlocked_booking().await;
        let alice = net.account("alice");

        let group = net.forge(vec![
            net.call("alice", pool.pool_id, CallAction::Withdrawal),
            escrow_leg(pool.rule, release(&pool, alice, 200), 50_000),
        ]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Escrow {
                index: 1,
                reason: EscrowRejection::FeeTooHigh {
                    fee: 50_000,
                    ceiling: 1_000,
                },
            })
        );
    }

    #[tokio::test]
    async fn test_extra_leg_refused() {
        let (net, pool) = unlocked_booking().await;
        let alice = net.account("alice");
        let mallory = net.account("mallory");

        let group = net.forge(vec![
            net.call("alice", pool.pool_id, CallAction::Withdrawal),
            net.escrow_transfer(pool.rule, alice, 200),
            net.transfer("alice", pool.asset_id, mallory, 1),
        ]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Escrow {
                index: 1,
                reason: EscrowRejection::UnsupportedGroupSize(3),
            })
        );
    }

    #[tokio::test]
    async fn test_escrow_leg_first_refused() {
        let (net, pool) = unlocked_booking().await;
        let alice = net.account("alice");

        let group = net.forge(vec![
            net.escrow_transfer(pool.rule, alice, 200),
            net.call("alice", pool.pool_id, CallAction::Withdrawal),
        ]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Escrow {
                index: 0,
                reason: EscrowRejection::LegOutOfPosition { index: 0 },
            })
        );
    }

    #[tokio::test]
    async fn test_call_into_other_pool_refused() {
        let (net, pool) = unlocked_booking().await;
        let alice = net.account("alice");
        let elsewhere = PoolId(pool.pool_id.0 + 99);

        let group = net.forge(vec![
            net.call("alice", elsewhere, CallAction::Withdrawal),
            net.escrow_transfer(pool.rule, alice, 200),
        ]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Escrow {
                index: 1,
                reason: EscrowRejection::CallTargetMismatch {
                    expected: pool.pool_id,
                    actual: elsewhere,
                },
            })
        );
    }

    #[tokio::test]
    async fn test_lifecycle_call_with_release_refused() {
        let (net, pool) = unlocked_booking().await;
        let alice = net.account("alice");

        let group = net.forge(vec![
            net.lifecycle("alice", pool.pool_id, OnCompletion::CloseOut),
            net.escrow_transfer(pool.rule, alice, 200),
        ]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Escrow {
                index: 1,
                reason: EscrowRejection::CallNotNoOp,
            })
        );
    }

    #[tokio::test]
    async fn test_substituted_rule_refused() {
        let (net, pool) = unlocked_booking().await;
        let alice = net.account("alice");

        // Looser rule presented for the real escrow address.
        let looser = pool.rule.with_fee_ceiling(u64::MAX);
        let (op, _) = net.escrow_transfer(pool.rule, alice, 200);
        let group = net.forge(vec![
            net.call("alice", pool.pool_id, CallAction::Withdrawal),
            (op, LegSigner::Escrow(looser)),
        ]);
        assert_eq!(
            net.commit(group).await,
            Err(LedgerRejection::Escrow {
                index: 1,
                reason: EscrowRejection::NotEscrowLeg { index: 1 },
            })
        );
    }

    #[tokio::test]
    async fn test_honest_withdrawal_still_works() {
        let (net, pool) = unlocked_booking().await;
        net.withdraw("alice", &pool, 200).await.unwrap();
        assert_eq!(net.balance(pool.escrow(), pool.asset_id), Some(900));
    }
}
