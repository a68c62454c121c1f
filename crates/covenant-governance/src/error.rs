use covenant_ledger::LedgerError;
use covenant_types::{Amount, BlockNumber, Timestamp};
use thiserror::Error;
use crate::proposal::ProposalId;

/// Errors that can occur in governance operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("Proposal already executed")]
    AlreadyExecuted,

    #[error("Proposal {0} failed")]
    ProposalFailed(ProposalId),

    #[error("Proposal not executable: {0}")]
    NotExecutable(String),

    #[error("Voting still in progress until block {end_block} (current {current})")]
    VotingInProgress { end_block: BlockNumber, current: BlockNumber },

    #[error("Voting not started: opens after block {start_block} (current {current})")]
    VotingNotStarted { start_block: BlockNumber, current: BlockNumber },

    #[error("Voting window [{start_block}, {end_block}] closed at block {current}")]
    VotingClosed {
        start_block: BlockNumber,
        end_block: BlockNumber,
        current: BlockNumber,
    },

    #[error("Insufficient voting power: {actual} < {required}")]
    InsufficientVotingPower { actual: Amount, required: Amount },

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Mismatched action lengths: {targets} targets, {values} values, {calls} calls")]
    MismatchedActionLengths { targets: usize, values: usize, calls: usize },

    #[error("Timelock not expired: ready at {ready_at}, now {now}")]
    TimelockNotExpired { ready_at: Timestamp, now: Timestamp },

    #[error("Action {index} failed: {reason}")]
    ExecutionFailed { index: usize, reason: String },

    #[error("Not an approver")]
    NotApprover,

    #[error("Approver already approved the pending change")]
    AlreadyApproved,

    #[error("Conflicting timelock duration: {proposed} while {pending} is pending")]
    ConflictingTimelockDuration { pending: Timestamp, proposed: Timestamp },

    #[error("Invalid approver set: {0}")]
    InvalidApproverSet(String),

    #[error("Fund request not found: {0}")]
    RequestNotFound(u64),

    #[error("Fund request {0} already executed")]
    RequestAlreadyExecuted(u64),

    #[error("Proposal {0} not approved")]
    ProposalNotApproved(ProposalId),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Zero address not allowed")]
    ZeroAddress,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Reentrant call into {0}")]
    Reentrancy(&'static str),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GovernanceError::InsufficientVotingPower { actual: 100, required: 200 };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn test_ledger_error_converts() {
        let err: GovernanceError = LedgerError::NothingToRelease.into();
        assert_eq!(err, GovernanceError::Ledger(LedgerError::NothingToRelease));
        assert!(err.to_string().contains("Nothing to release"));
    }
}
