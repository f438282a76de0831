//! Insurance pool: policy sales, delay credits and withdrawals
//!
//! The pool escrows dues, premiums and oracle fees. A policy pays
//! `premium * payout_multiplier` into the passenger's withdrawable balance
//! once its flight is finalized as an airline-fault delay. Withdrawals go
//! through a [`FundsTransfer`] backend and are all-or-nothing.

use crate::{
    config::InsuranceConfig,
    flights::Flight,
    treasury::FundsTransfer,
    types::{Address, Amount, FlightId, FlightKey, FlightStatus, PolicyState},
    Error, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Insurance policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy holder
    pub passenger: Address,

    /// Insured flight
    pub flight: FlightKey,

    /// Premium paid
    pub amount: Amount,

    /// Amount credited on airline-fault delay
    pub payout_amount: Amount,

    /// Lifecycle state
    pub state: PolicyState,
}

impl Policy {
    /// Zero-valued record returned when no policy exists
    ///
    /// Its `state` carries no meaning. Callers check [`Policy::is_empty`]
    /// before reading it.
    pub fn empty(passenger: Address, flight: FlightKey) -> Self {
        Self {
            passenger,
            flight,
            amount: Decimal::ZERO,
            payout_amount: Decimal::ZERO,
            state: PolicyState::Active,
        }
    }

    /// True for the zero-valued record
    pub fn is_empty(&self) -> bool {
        self.amount.is_zero()
    }

    /// Active or Credited policies block a second purchase
    fn is_live(&self) -> bool {
        matches!(self.state, PolicyState::Active | PolicyState::Credited)
    }
}

/// Insurance pool
#[derive(Debug)]
pub struct InsurancePool {
    policies: HashMap<(Address, FlightId), Policy>,
    holders: HashMap<FlightId, Vec<Address>>,
    balances: HashMap<Address, Amount>,
    pool_balance: Amount,
    max_premium: Amount,
    payout_multiplier: Decimal,
}

impl InsurancePool {
    /// Create empty pool
    pub fn new(config: &InsuranceConfig) -> Self {
        Self {
            policies: HashMap::new(),
            holders: HashMap::new(),
            balances: HashMap::new(),
            pool_balance: Decimal::ZERO,
            max_premium: config.max_premium,
            payout_multiplier: config.payout_multiplier,
        }
    }

    /// Escrow funds (dues, fees) into the pool
    pub fn deposit(&mut self, amount: Amount) {
        self.pool_balance += amount;
    }

    /// Payout for a given premium, in exact decimal arithmetic
    pub fn payout_for(&self, premium: Amount) -> Amount {
        premium * self.payout_multiplier
    }

    /// Sell a policy on `flight`
    pub fn buy(&mut self, passenger: &Address, flight: &Flight, amount: Amount) -> Result<&Policy> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(amount));
        }
        if amount > self.max_premium {
            return Err(Error::PremiumTooHigh {
                max: self.max_premium,
                provided: amount,
            });
        }

        let slot = (passenger.clone(), flight.index);
        if self.policies.get(&slot).is_some_and(Policy::is_live) {
            return Err(Error::DuplicatePolicy {
                passenger: passenger.clone(),
                flight: flight.key.clone(),
            });
        }

        let policy = Policy {
            passenger: passenger.clone(),
            flight: flight.key.clone(),
            amount,
            payout_amount: self.payout_for(amount),
            state: PolicyState::Active,
        };

        self.pool_balance += amount;
        let holders = self.holders.entry(flight.index).or_default();
        if !holders.contains(passenger) {
            holders.push(passenger.clone());
        }

        tracing::info!(
            passenger = %passenger,
            flight = %flight.key,
            %amount,
            payout = %policy.payout_amount,
            "insurance purchased"
        );

        self.policies.insert(slot.clone(), policy);
        Ok(&self.policies[&slot])
    }

    /// Credit every Active policy on `flight` if `status` is an airline-fault delay
    ///
    /// Returns the policies that moved to Credited.
    pub fn credit_on_delay(&mut self, flight: FlightId, status: FlightStatus) -> Vec<Policy> {
        if !status.is_airline_fault() {
            tracing::debug!(flight, %status, "no payout for status");
            return Vec::new();
        }

        let Some(holders) = self.holders.get(&flight) else {
            return Vec::new();
        };

        let mut credited = Vec::new();
        for passenger in holders {
            let Some(policy) = self.policies.get_mut(&(passenger.clone(), flight)) else {
                continue;
            };
            if policy.state != PolicyState::Active {
                continue;
            }

            policy.state = PolicyState::Credited;
            *self.balances.entry(passenger.clone()).or_default() += policy.payout_amount;
            tracing::info!(passenger = %passenger, flight = %policy.flight, amount = %policy.payout_amount, "insurance credited");
            credited.push(policy.clone());
        }
        credited
    }

    /// Transfer the passenger's whole balance out
    ///
    /// Balance, pool and policies are only touched after the transfer
    /// succeeded, so a refused transfer leaves everything unchanged.
    pub fn withdraw(&mut self, passenger: &Address, transfer: &dyn FundsTransfer) -> Result<Amount> {
        let amount = self.balance(passenger);
        if amount <= Decimal::ZERO {
            return Err(Error::NothingToWithdraw(passenger.clone()));
        }
        if amount > self.pool_balance {
            return Err(Error::PoolUnderfunded {
                balance: self.pool_balance,
                requested: amount,
            });
        }

        transfer.transfer(passenger, amount)?;

        self.balances.remove(passenger);
        self.pool_balance -= amount;
        for policy in self
            .policies
            .values_mut()
            .filter(|p| &p.passenger == passenger && p.state == PolicyState::Credited)
        {
            policy.state = PolicyState::Withdrawn;
        }

        tracing::info!(passenger = %passenger, %amount, "balance withdrawn");
        Ok(amount)
    }

    /// Policy record, if any
    pub fn policy(&self, passenger: &Address, flight: FlightId) -> Option<&Policy> {
        self.policies.get(&(passenger.clone(), flight))
    }

    /// Withdrawable balance
    pub fn balance(&self, passenger: &Address) -> Amount {
        self.balances.get(passenger).copied().unwrap_or_default()
    }

    /// Escrowed funds held by the pool
    pub fn pool_balance(&self) -> Amount {
        self.pool_balance
    }

    /// Number of policies ever sold
    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }
}
