use covenant_types::{Address, Amount, BlockNumber, Timestamp};
use thiserror::Error;

/// Errors that can occur in ledger and vesting operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient balance for {account:?}: need {needed}, have {available}")]
    InsufficientBalance {
        account: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("Transfer of {amount} exceeds unlocked balance {available} of {account:?}")]
    TransferLocked {
        account: Address,
        amount: Amount,
        available: Amount,
    },

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Zero address not allowed")]
    ZeroAddress,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Invalid vesting schedule: {0}")]
    InvalidSchedule(String),

    #[error("Schedule {index} not found for {beneficiary:?}")]
    ScheduleNotFound { beneficiary: Address, index: usize },

    #[error("Cliff not reached: cliff at {cliff}, now {now}")]
    CliffNotReached { cliff: Timestamp, now: Timestamp },

    #[error("Nothing to release")]
    NothingToRelease,

    #[error("Insufficient pool balance: need {required}, have {available}")]
    InsufficientPoolBalance { required: Amount, available: Amount },

    #[error("Checkpoint at block {block} precedes latest checkpoint at {latest}")]
    CheckpointOutOfOrder { block: BlockNumber, latest: BlockNumber },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Arithmetic overflow")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::CliffNotReached { cliff: 100, now: 50 };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("50"));
    }

    #[test]
    fn test_pool_error() {
        let err = LedgerError::InsufficientPoolBalance { required: 10, available: 3 };
        assert!(err.to_string().contains("need 10"));
    }
}
