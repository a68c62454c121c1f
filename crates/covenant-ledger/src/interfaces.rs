//! Capabilities the governance and vesting layers consume.
//!
//! Implementations are provided by the host ledger; [`crate::CheckpointedToken`]
//! is the in-memory reference.

use covenant_types::{Address, Amount, BlockNumber, Timestamp};
use crate::error::LedgerError;

/// Token balance and transfer primitive.
pub trait TokenLedger {
    /// Current balance of `account`.
    fn balance_of(&self, account: &Address) -> Amount;

    /// Move `amount` from `from` to `to`. Either fully applies or leaves
    /// balances untouched.
    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError>;
}

/// Historical voting power.
pub trait VotingPowerSource {
    /// Voting power of `account` as of the end of `block`. The answer for a
    /// past block never changes.
    fn past_voting_power(&self, account: &Address, block: BlockNumber) -> Amount;
}

/// Portion of an account's balance that may not move yet.
pub trait LockedBalanceSource {
    fn locked_balance(&self, account: &Address, now: Timestamp) -> Amount;
}
