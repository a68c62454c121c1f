//! Transfer guard.
//!
//! Consulted on every transfer: a sender may move at most
//! `balance - locked`, where `locked` is the unvested part of its vesting
//! allocation. Privileged identities bypass the check on either side of the
//! transfer.

use std::collections::BTreeMap;
use covenant_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::error::LedgerError;
use crate::interfaces::{LockedBalanceSource, TokenLedger};

/// Why an identity bypasses the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivilegedRole {
    /// The vesting engine's pool
    VestingPool,
    /// Staking sink
    StakingSink,
    /// Treasury sink
    Treasury,
    /// Governance engine (holds proposal-controlled funds)
    Governance,
}

/// Lock enforcement for the token ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferGuard {
    /// Identity allowed to change exemptions
    owner: Address,
    /// Exempt identities
    exempt: BTreeMap<Address, PrivilegedRole>,
}

impl TransferGuard {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            exempt: BTreeMap::new(),
        }
    }

    /// Builder-style exemption used at genesis.
    pub fn with_exempt(mut self, account: Address, role: PrivilegedRole) -> Self {
        self.exempt.insert(account, role);
        self
    }

    /// Register a privileged identity.
    pub fn set_exempt(
        &mut self,
        caller: Address,
        account: Address,
        role: PrivilegedRole,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if account.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        self.exempt.insert(account, role);
        info!(account = %account, ?role, "transfer guard exemption added");
        Ok(())
    }

    /// Remove a privileged identity.
    pub fn remove_exempt(&mut self, caller: Address, account: &Address) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        self.exempt.remove(account);
        Ok(())
    }

    /// Zero (mint/burn) and registered identities are exempt.
    pub fn is_exempt(&self, account: &Address) -> bool {
        account.is_zero() || self.exempt.contains_key(account)
    }

    /// Role of a registered identity.
    pub fn role_of(&self, account: &Address) -> Option<PrivilegedRole> {
        self.exempt.get(account).copied()
    }

    /// Check a transfer. `locked` is only evaluated when neither side is
    /// exempt.
    pub fn check(
        &self,
        from: &Address,
        to: &Address,
        amount: Amount,
        balance: Amount,
        locked: impl FnOnce() -> Amount,
    ) -> Result<(), LedgerError> {
        if self.is_exempt(from) || self.is_exempt(to) {
            return Ok(());
        }

        let available = balance.saturating_sub(locked());
        if amount > available {
            debug!(from = %from, amount, available, "transfer blocked by vesting lock");
            return Err(LedgerError::TransferLocked {
                account: *from,
                amount,
                available,
            });
        }
        Ok(())
    }

    fn require_owner(&self, caller: Address) -> Result<(), LedgerError> {
        if caller != self.owner {
            return Err(LedgerError::Unauthorized("only the guard owner may change exemptions".to_string()));
        }
        Ok(())
    }
}

/// A ledger view that runs every transfer through a [`TransferGuard`].
pub struct GuardedToken<'a> {
    inner: &'a mut dyn TokenLedger,
    guard: &'a TransferGuard,
    locks: &'a dyn LockedBalanceSource,
    now: Timestamp,
}

impl<'a> GuardedToken<'a> {
    pub fn new(
        inner: &'a mut dyn TokenLedger,
        guard: &'a TransferGuard,
        locks: &'a dyn LockedBalanceSource,
        now: Timestamp,
    ) -> Self {
        Self { inner, guard, locks, now }
    }
}

impl TokenLedger for GuardedToken<'_> {
    fn balance_of(&self, account: &Address) -> Amount {
        self.inner.balance_of(account)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.inner.balance_of(&from);
        let locks = self.locks;
        let now = self.now;
        self.guard
            .check(&from, &to, amount, balance, || locks.locked_balance(&from, now))?;
        self.inner.transfer(from, to, amount)
    }
}
