//! Checkpointed fungible token.
//!
//! Reference implementation of the ledger interfaces. Every balance change
//! writes a checkpoint at the current block, so voting power at a past block
//! is fixed once that block is over. Voting power equals balance: every
//! holder is treated as self-delegated.

use std::collections::HashMap;
use covenant_types::{Address, Amount, BlockNumber};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::checkpoint::{CheckpointMark, Checkpoints};
use crate::error::LedgerError;
use crate::interfaces::{TokenLedger, VotingPowerSource};

/// In-memory token with per-account vote checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointedToken {
    /// Ticker
    pub symbol: String,
    /// Block new checkpoints are written at
    current_block: BlockNumber,
    /// Current balances
    balances: HashMap<Address, Amount>,
    /// Vote history per account
    votes: HashMap<Address, Checkpoints>,
    /// Total supply history
    supply: Checkpoints,
    /// Open undo journal, if any
    #[serde(skip)]
    journal: Option<Journal>,
}

/// State of everything written since [`CheckpointedToken::begin_journal`].
#[derive(Debug, Clone)]
struct Journal {
    block: BlockNumber,
    supply: CheckpointMark,
    /// First-touch state of each written account
    accounts: HashMap<Address, AccountMark>,
}

#[derive(Debug, Clone, Copy)]
struct AccountMark {
    balance: Option<Amount>,
    votes: Option<CheckpointMark>,
}

impl CheckpointedToken {
    /// Create an empty token at block 0.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            current_block: 0,
            balances: HashMap::new(),
            votes: HashMap::new(),
            supply: Checkpoints::new(),
            journal: None,
        }
    }

    /// Start recording writes so they can be undone. Replaces any journal
    /// already open.
    pub fn begin_journal(&mut self) {
        self.journal = Some(Journal {
            block: self.current_block,
            supply: self.supply.mark(),
            accounts: HashMap::new(),
        });
    }

    /// Keep every write since [`Self::begin_journal`].
    pub fn commit_journal(&mut self) {
        self.journal = None;
    }

    /// Undo every write since [`Self::begin_journal`]. A no-op without an
    /// open journal.
    pub fn rollback_journal(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };

        for (account, mark) in journal.accounts {
            match mark.balance {
                Some(balance) => self.balances.insert(account, balance),
                None => self.balances.remove(&account),
            };
            match mark.votes {
                Some(votes) => {
                    if let Some(history) = self.votes.get_mut(&account) {
                        history.rollback(votes);
                    }
                }
                None => {
                    self.votes.remove(&account);
                }
            }
        }
        self.supply.rollback(journal.supply);
        self.current_block = journal.block;
        debug!("token writes rolled back");
    }

    /// Block new checkpoints are written at.
    pub fn current_block(&self) -> BlockNumber {
        self.current_block
    }

    /// Move the ledger clock forward. Going back would rewrite history.
    pub fn advance_to(&mut self, block: BlockNumber) -> Result<(), LedgerError> {
        if block < self.current_block {
            return Err(LedgerError::CheckpointOutOfOrder {
                block,
                latest: self.current_block,
            });
        }
        self.current_block = block;
        Ok(())
    }

    /// Current total supply.
    pub fn total_supply(&self) -> Amount {
        self.supply.latest()
    }

    /// Total supply as of the end of `block`.
    pub fn past_total_supply(&self, block: BlockNumber) -> Amount {
        self.supply.upper_lookup(block)
    }

    /// Create `amount` new tokens for `to`.
    pub fn mint(&mut self, to: Address, amount: Amount) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let supply = self.total_supply().checked_add(amount).ok_or(LedgerError::Overflow)?;
        let balance = self.balance_of(&to).checked_add(amount).ok_or(LedgerError::Overflow)?;

        self.supply.push(self.current_block, supply)?;
        self.write_balance(to, balance)?;
        debug!(to = %to, amount, "minted");
        Ok(())
    }

    /// Destroy `amount` tokens held by `from`.
    pub fn burn(&mut self, from: Address, amount: Amount) -> Result<(), LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let available = self.balance_of(&from);
        let balance = available.checked_sub(amount).ok_or(LedgerError::InsufficientBalance {
            account: from,
            needed: amount,
            available,
        })?;
        let supply = self.total_supply().saturating_sub(amount);

        self.supply.push(self.current_block, supply)?;
        self.write_balance(from, balance)?;
        debug!(from = %from, amount, "burned");
        Ok(())
    }

    /// Number of checkpoints recorded for `account`.
    pub fn checkpoint_count(&self, account: &Address) -> usize {
        self.votes.get(account).map(Checkpoints::len).unwrap_or(0)
    }

    fn write_balance(&mut self, account: Address, balance: Amount) -> Result<(), LedgerError> {
        if let Some(journal) = self.journal.as_mut() {
            if !journal.accounts.contains_key(&account) {
                let mark = AccountMark {
                    balance: self.balances.get(&account).copied(),
                    votes: self.votes.get(&account).map(Checkpoints::mark),
                };
                journal.accounts.insert(account, mark);
            }
        }
        self.votes
            .entry(account)
            .or_default()
            .push(self.current_block, balance)?;
        self.balances.insert(account, balance);
        Ok(())
    }
}

impl TokenLedger for CheckpointedToken {
    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        if from.is_zero() || to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }

        let available = self.balance_of(&from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from,
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }

        let to_balance = self.balance_of(&to).checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.write_balance(from, available - amount)?;
        self.write_balance(to, to_balance)?;

        debug!(from = %from, to = %to, amount, block = self.current_block, "transfer");
        Ok(())
    }
}

impl VotingPowerSource for CheckpointedToken {
    fn past_voting_power(&self, account: &Address, block: BlockNumber) -> Amount {
        self.votes
            .get(account)
            .map(|cp| cp.upper_lookup(block))
            .unwrap_or(0)
    }
}
