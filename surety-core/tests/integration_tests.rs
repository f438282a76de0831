//! Integration tests for the surety actor
//!
//! Exercises complete lifecycles through `SuretyHandle`:
//! - Federation bootstrap and the multi-party approval threshold
//! - Policy purchase, oracle consensus, credit and withdrawal
//! - Concurrent callers serialized by the single writer

use rust_decimal::Decimal;
use std::sync::Arc;
use surety_core::{
    airlines::ApprovalOutcome,
    oracles::{RequestOutcome, VoteOutcome},
    spawn_surety_actor,
    treasury::InMemoryWallets,
    Address, AirlineState, Config, Error, ErrorCategory, FlightKey, FlightStatus, PolicyState,
    ShardIndex, SuretyEvent, SuretyHandle,
};

const ORACLE_FLEET: usize = 60;

struct TestEnvironment {
    handle: SuretyHandle,
    wallets: Arc<InMemoryWallets>,
    founder: Address,
}

impl TestEnvironment {
    fn new() -> Self {
        let mut config = Config::default();
        config.oracle.rng_seed = Some(42);
        let founder = config.governance.founding_airline.clone();
        let wallets = Arc::new(InMemoryWallets::new());
        let handle = spawn_surety_actor(config, wallets.clone()).unwrap();
        Self {
            handle,
            wallets,
            founder,
        }
    }

    async fn onboard(&self, address: &Address) {
        self.handle.apply_airline("Carrier", address).await.unwrap();
        self.handle.approve_airline(address, &self.founder).await.unwrap();
        self.handle.pay_dues(address, Decimal::from(10)).await.unwrap();
    }

    async fn flight(&self, name: &str) -> FlightKey {
        let index = self
            .handle
            .register_flight(&self.founder, name, 1_700_000_000)
            .await
            .unwrap();
        self.handle.flight(index).unwrap().key
    }

    async fn register_fleet(&self) -> Vec<Address> {
        let mut fleet = Vec::with_capacity(ORACLE_FLEET);
        for n in 0..ORACLE_FLEET {
            let oracle = Address::new(format!("oracle-{}", n));
            self.handle.register_oracle(&oracle, Decimal::ONE).await.unwrap();
            fleet.push(oracle);
        }
        fleet
    }

    fn holders(&self, fleet: &[Address], index: ShardIndex) -> Vec<Address> {
        fleet
            .iter()
            .filter(|o| self.handle.oracle_indexes(o).unwrap().contains(&index))
            .cloned()
            .collect()
    }

    async fn request(&self, key: &FlightKey) -> ShardIndex {
        match self.handle.request_status(key).await.unwrap() {
            RequestOutcome::Requested { index, .. } => index,
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_federation_threshold() {
    let env = TestEnvironment::new();
    let handle = &env.handle;

    // Bootstrap: a single approval registers while paid count ≤ 4
    for n in 1..=4 {
        env.onboard(&Address::new(format!("airline-{}", n))).await;
    }
    assert_eq!(handle.pool_balance(), Decimal::from(40));
    assert_eq!(handle.metrics().paid_airlines.get(), 5);

    // Five paid airlines: half of them (floor) must approve
    let sixth = Address::new("airline-5");
    handle.apply_airline("Sixth", &sixth).await.unwrap();

    let outcome = handle.approve_airline(&sixth, &env.founder).await.unwrap();
    assert_eq!(outcome, ApprovalOutcome::Pending { votes: 1, required: 2 });

    // Re-approval by the same voter is a no-op
    let outcome = handle.approve_airline(&sixth, &env.founder).await.unwrap();
    assert_eq!(outcome, ApprovalOutcome::Pending { votes: 1, required: 2 });
    assert_eq!(handle.airline_state(&sixth), Some(AirlineState::Applied));

    let outcome = handle
        .approve_airline(&sixth, &Address::new("airline-1"))
        .await
        .unwrap();
    assert_eq!(outcome, ApprovalOutcome::Registered { votes: 2 });
    assert_eq!(handle.airline_state(&sixth), Some(AirlineState::Registered));

    // Registered but unpaid airlines cannot vote
    let seventh = Address::new("airline-6");
    handle.apply_airline("Seventh", &seventh).await.unwrap();
    let err = handle.approve_airline(&seventh, &sixth).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unauthorized);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dues_below_minimum_rejected() {
    let env = TestEnvironment::new();
    let airline = Address::new("airline-1");
    env.handle.apply_airline("Second", &airline).await.unwrap();

    let err = env.handle.pay_dues(&airline, Decimal::from(10)).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidState);

    env.handle.approve_airline(&airline, &env.founder).await.unwrap();
    let err = env.handle.pay_dues(&airline, Decimal::from(9)).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds { .. }));
    assert_eq!(env.handle.airline_state(&airline), Some(AirlineState::Registered));
    assert_eq!(env.handle.pool_balance(), Decimal::ZERO);

    env.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_policy_lifecycle_with_oracle_consensus() {
    let env = TestEnvironment::new();
    let handle = &env.handle;
    let key = env.flight("FLT1").await;
    let passenger = Address::new("passenger-1");

    let policy = handle.buy_insurance(&passenger, &key, Decimal::ONE).await.unwrap();
    assert_eq!(policy.payout_amount, Decimal::new(15, 1));

    let err = handle
        .buy_insurance(&passenger, &key, Decimal::ONE)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicatePolicy { .. }));

    let err = handle
        .buy_insurance(&Address::new("passenger-2"), &key, Decimal::from(2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PremiumTooHigh { .. }));

    let fleet = env.register_fleet().await;
    let index = env.request(&key).await;
    let holders = env.holders(&fleet, index);
    assert!(holders.len() >= 4, "fleet too small for index {}", index);

    // A dissenting vote does not block the majority
    let outcome = handle
        .submit_response(&holders[0], index, &key, FlightStatus::OnTime)
        .await
        .unwrap();
    assert_eq!(outcome, VoteOutcome::Recorded { tally: 1 });

    let mut outcomes = Vec::new();
    for oracle in &holders[1..4] {
        outcomes.push(
            handle
                .submit_response(oracle, index, &key, FlightStatus::LateAirline)
                .await
                .unwrap(),
        );
    }
    assert_eq!(outcomes[2], VoteOutcome::Finalized(FlightStatus::LateAirline));
    assert_eq!(handle.final_status(&key).unwrap(), Some(FlightStatus::LateAirline));
    assert_eq!(handle.flight(0).unwrap().status, FlightStatus::LateAirline);
    assert!(handle.pending_requests().is_empty());

    // Late votes cannot move a final status
    if let Some(late) = holders.get(4) {
        let outcome = handle
            .submit_response(late, index, &key, FlightStatus::OnTime)
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome::Ignored(FlightStatus::LateAirline));
    }

    assert_eq!(handle.insurance(&passenger, &key).state, PolicyState::Credited);
    assert_eq!(handle.balance(&passenger), Decimal::new(15, 1));

    let paid = handle.withdraw_balance(&passenger).await.unwrap();
    assert_eq!(paid, Decimal::new(15, 1));
    assert_eq!(env.wallets.balance_of(&passenger), Decimal::new(15, 1));
    assert_eq!(handle.metrics().payouts_total.get(), 1);
    assert_eq!(handle.metrics().status_finalized_total.get(), 1);

    let err = handle.withdraw_balance(&passenger).await.unwrap_err();
    assert!(matches!(err, Error::NothingToWithdraw(_)));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_vote_from_foreign_index_rejected() {
    let env = TestEnvironment::new();
    let key = env.flight("FLT1").await;
    let fleet = env.register_fleet().await;
    let index = env.request(&key).await;

    let outsider = fleet
        .iter()
        .find(|o| !env.handle.oracle_indexes(o).unwrap().contains(&index))
        .unwrap();
    let err = env
        .handle
        .submit_response(outsider, index, &key, FlightStatus::LateAirline)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IndexMismatch { .. }));

    let stranger = Address::new("not-an-oracle");
    let err = env
        .handle
        .submit_response(&stranger, index, &key, FlightStatus::LateAirline)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unauthorized);

    env.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_refused_transfer_keeps_balance() {
    let env = TestEnvironment::new();
    let handle = &env.handle;
    let key = env.flight("FLT1").await;
    let passenger = Address::new("passenger-1");
    handle.buy_insurance(&passenger, &key, Decimal::ONE).await.unwrap();

    let fleet = env.register_fleet().await;
    let index = env.request(&key).await;
    for oracle in env.holders(&fleet, index).iter().take(3) {
        handle
            .submit_response(oracle, index, &key, FlightStatus::LateAirline)
            .await
            .unwrap();
    }

    env.wallets.refuse(&passenger);
    let err = handle.claim_insurance(&passenger, &key).await.unwrap_err();
    assert!(matches!(err, Error::TransferFailed { .. }));
    assert_eq!(handle.balance(&passenger), Decimal::new(15, 1));
    assert_eq!(handle.insurance(&passenger, &key).state, PolicyState::Credited);

    env.wallets.accept(&passenger);
    let paid = handle.claim_insurance(&passenger, &key).await.unwrap();
    assert_eq!(paid, Decimal::new(15, 1));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_purchases_serialized() {
    let env = TestEnvironment::new();
    let key = env.flight("FLT1").await;
    let premium = Decimal::new(50, 2);

    let mut tasks = Vec::new();
    for n in 0..20 {
        let handle = env.handle.clone();
        let key = key.clone();
        tasks.push(tokio::spawn(async move {
            let passenger = Address::new(format!("passenger-{}", n));
            handle.buy_insurance(&passenger, &key, premium).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(env.handle.pool_balance(), premium * Decimal::from(20));
    assert_eq!(env.handle.metrics().policies_total.get(), 20);

    let purchases = env
        .handle
        .events_since(0)
        .iter()
        .filter(|r| matches!(r.event, SuretyEvent::InsurancePurchased { .. }))
        .count();
    assert_eq!(purchases, 20);

    env.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_paused_contract() {
    let env = TestEnvironment::new();
    let handle = &env.handle;

    handle.set_operational(&env.founder, false).await.unwrap();
    let err = handle
        .register_flight(&env.founder, "FLT1", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotOperational));

    handle.set_operational(&env.founder, true).await.unwrap();
    assert!(handle.register_flight(&env.founder, "FLT1", 1).await.is_ok());

    handle.shutdown().await.unwrap();
}
