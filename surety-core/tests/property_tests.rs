//! Property-based tests for surety invariants
//!
//! These tests use proptest to verify:
//! - Payout is exactly 1.5x the premium
//! - Airline state never moves backwards
//! - The pool escrows every dues payment
//! - A credited balance is paid out at most once

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use surety_core::{
    oracles::RequestOutcome,
    treasury::InMemoryWallets,
    types::{Address, AirlineState, FlightKey, FlightStatus, PolicyState},
    Config, Error, FlightSurety,
};

/// Strategy for premiums in (0, 1] with two decimals
fn premium_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=100i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for a status reported by the quorum
fn status_strategy() -> impl Strategy<Value = FlightStatus> {
    prop::sample::select(FlightStatus::ALL.to_vec())
}

/// Governance action against a random airline
#[derive(Debug, Clone)]
enum Action {
    Apply(usize),
    Approve(usize, usize),
    Pay(usize),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0usize..8).prop_map(Action::Apply),
        (0usize..8, 0usize..8).prop_map(|(c, a)| Action::Approve(c, a)),
        (0usize..8).prop_map(Action::Pay),
    ]
}

fn create_surety(seed: u64) -> (FlightSurety, Arc<InMemoryWallets>, Address) {
    let mut config = Config::default();
    config.oracle.rng_seed = Some(seed);
    let founder = config.governance.founding_airline.clone();
    let wallets = Arc::new(InMemoryWallets::new());
    let surety = FlightSurety::new(config, wallets.clone()).unwrap();
    (surety, wallets, founder)
}

fn airline(n: usize) -> Address {
    Address::new(format!("airline-{}", n))
}

/// Request a status and register oracles until the quorum votes `status`
fn settle(surety: &mut FlightSurety, key: &FlightKey, status: FlightStatus) {
    let index = match surety.request_status(key).unwrap() {
        RequestOutcome::Requested { index, .. } => index,
        RequestOutcome::AlreadyFinal(_) => return,
    };

    let mut voters = 0;
    let mut n = 0;
    while voters < 3 {
        let oracle = Address::new(format!("oracle-{}-{}", key.name, n));
        n += 1;
        if surety.register_oracle(&oracle, Decimal::ONE).unwrap().contains(&index) {
            surety.submit_response(&oracle, index, key, status).unwrap();
            voters += 1;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the recorded payout is premium × 1.5 exactly
    #[test]
    fn prop_payout_is_one_and_a_half_premium(premium in premium_strategy()) {
        let (mut surety, _, founder) = create_surety(1);
        let index = surety.register_flight(&founder, "FLT1", 1_700_000_000).unwrap();
        let key = surety.flight(index).unwrap().key.clone();

        let policy = surety.buy_insurance(&Address::new("p1"), &key, premium).unwrap();
        prop_assert_eq!(policy.payout_amount, premium * Decimal::new(15, 1));
        prop_assert_eq!(surety.pool_balance(), premium);
    }

    /// Property: airline state is monotone under any action sequence
    #[test]
    fn prop_airline_state_monotonic(actions in prop::collection::vec(action_strategy(), 1..60)) {
        let (mut surety, _, _) = create_surety(2);
        let mut last: Vec<Option<AirlineState>> = vec![None; 8];
        last[0] = Some(AirlineState::Paid);

        for action in actions {
            let _ = match action {
                Action::Apply(n) => surety.apply_airline("Carrier", &airline(n)).map(|_| ()),
                Action::Approve(c, a) => surety.approve_airline(&airline(c), &airline(a)).map(|_| ()),
                Action::Pay(n) => surety.pay_dues(&airline(n), Decimal::from(10)),
            };

            for (n, previous) in last.iter_mut().enumerate() {
                let current = surety.airline_state(&airline(n));
                prop_assert!(current >= *previous, "airline-{} went from {:?} to {:?}", n, previous, current);
                *previous = current;
            }
        }
    }

    /// Property: N airlines paying D leave N × D in the pool
    #[test]
    fn prop_dues_escrowed(count in 1usize..4, dues in 10i64..50) {
        let (mut surety, _, founder) = create_surety(3);
        let dues = Decimal::from(dues);

        for n in 1..=count {
            surety.apply_airline("Carrier", &airline(n)).unwrap();
            surety.approve_airline(&airline(n), &founder).unwrap();
            surety.pay_dues(&airline(n), dues).unwrap();
        }

        prop_assert_eq!(surety.pool_balance(), dues * Decimal::from(count as i64));
        prop_assert_eq!(surety.paid_airline_count(), count + 1);
    }

    /// Property: withdrawals never pay more than what was credited
    #[test]
    fn prop_withdraw_never_double_pays(
        premiums in prop::collection::vec(premium_strategy(), 1..5),
        status in status_strategy(),
        attempts in 1usize..4,
    ) {
        let (mut surety, wallets, founder) = create_surety(4);
        let passenger = Address::new("passenger-1");

        let mut keys = Vec::new();
        for (n, premium) in premiums.iter().enumerate() {
            let index = surety.register_flight(&founder, &format!("FLT{}", n), 1_700_000_000).unwrap();
            let key = surety.flight(index).unwrap().key.clone();
            surety.buy_insurance(&passenger, &key, *premium).unwrap();
            keys.push(key);
        }
        for key in &keys {
            settle(&mut surety, key, status);
        }

        let expected = if status == FlightStatus::LateAirline {
            premiums.iter().copied().sum::<Decimal>() * Decimal::new(15, 1)
        } else {
            Decimal::ZERO
        };
        prop_assert_eq!(surety.balance(&passenger), expected);

        let mut paid = Decimal::ZERO;
        for _ in 0..attempts {
            match surety.withdraw_balance(&passenger) {
                Ok(amount) => paid += amount,
                Err(Error::NothingToWithdraw(_)) => {}
                Err(e) => return Err(TestCaseError::fail(e.to_string())),
            }
        }

        prop_assert_eq!(paid, expected);
        prop_assert_eq!(wallets.balance_of(&passenger), expected);
        prop_assert_eq!(surety.balance(&passenger), Decimal::ZERO);

        let expected_state = if status == FlightStatus::LateAirline {
            PolicyState::Withdrawn
        } else {
            PolicyState::Active
        };
        for key in &keys {
            prop_assert_eq!(surety.insurance(&passenger, key).state, expected_state);
        }
    }
}

#[test]
fn test_premium_at_raised_cap_pays_out_in_full() {
    let mut config = Config::default();
    config.oracle.rng_seed = Some(5);
    config.insurance.max_premium = Decimal::from(10);
    let founder = config.governance.founding_airline.clone();
    let wallets = Arc::new(InMemoryWallets::new());
    let mut surety = FlightSurety::new(config, wallets.clone()).unwrap();

    // Dues keep the pool solvent for the payout above the premium
    surety.apply_airline("Member", &airline(1)).unwrap();
    surety.approve_airline(&airline(1), &founder).unwrap();
    surety.pay_dues(&airline(1), Decimal::from(10)).unwrap();

    let index = surety.register_flight(&founder, "FLT-CAP", 1_700_000_000).unwrap();
    let key = surety.flight(index).unwrap().key.clone();
    let passenger = Address::new("passenger-cap");

    assert!(matches!(
        surety.buy_insurance(&passenger, &key, Decimal::new(1001, 2)),
        Err(Error::PremiumTooHigh { .. })
    ));
    let policy = surety.buy_insurance(&passenger, &key, Decimal::from(10)).unwrap();
    assert_eq!(policy.payout_amount, Decimal::from(15));

    settle(&mut surety, &key, FlightStatus::LateAirline);
    assert_eq!(surety.balance(&passenger), Decimal::from(15));
    assert_eq!(surety.withdraw_balance(&passenger).unwrap(), Decimal::from(15));
    assert_eq!(wallets.balance_of(&passenger), Decimal::from(15));
}
