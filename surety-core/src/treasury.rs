//! Outbound value transfers
//!
//! The pool never moves funds itself; it asks a [`FundsTransfer`] backend to
//! pay the recipient and only debits its own books when the backend accepts.

use crate::{
    types::{Address, Amount},
    Error, Result,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Pays native currency out of the pool
pub trait FundsTransfer: Send + Sync + std::fmt::Debug {
    /// Transfer `amount` to `recipient`
    ///
    /// An error means nothing was paid.
    fn transfer(&self, recipient: &Address, amount: Amount) -> Result<()>;
}

/// In-memory wallet book
///
/// Accounts listed via [`InMemoryWallets::refuse`] reject incoming transfers,
/// like a recipient contract without a payable fallback.
#[derive(Debug, Default)]
pub struct InMemoryWallets {
    balances: Mutex<HashMap<Address, Amount>>,
    refusing: Mutex<HashSet<Address>>,
}

impl InMemoryWallets {
    /// Create empty wallet book
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `address` reject transfers
    pub fn refuse(&self, address: &Address) {
        self.refusing.lock().insert(address.clone());
    }

    /// Let `address` accept transfers again
    pub fn accept(&self, address: &Address) {
        self.refusing.lock().remove(address);
    }

    /// Funds received by `address`
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.balances
            .lock()
            .get(address)
            .copied()
            .unwrap_or_default()
    }
}

impl FundsTransfer for InMemoryWallets {
    fn transfer(&self, recipient: &Address, amount: Amount) -> Result<()> {
        if self.refusing.lock().contains(recipient) {
            return Err(Error::TransferFailed {
                recipient: recipient.clone(),
                reason: "recipient rejects incoming transfers".to_string(),
            });
        }

        *self.balances.lock().entry(recipient.clone()).or_default() += amount;
        Ok(())
    }
}
