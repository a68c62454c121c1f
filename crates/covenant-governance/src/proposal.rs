//! Proposal lifecycle management.
//!
//! Proposals go through states: Active -> Succeeded -> Queued -> Executed,
//! or Active -> Failed. Pending is only the zero value.

use std::collections::BTreeSet;
use covenant_types::{Address, Amount, BlockNumber, Timestamp};
use serde::{Deserialize, Serialize};
use crate::action::Action;
use crate::error::GovernanceError;
use crate::voting::VoteSupport;

/// Proposal sequence number.
pub type ProposalId = u64;

/// Proposal status in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProposalState {
    /// Zero value, never entered by a live proposal
    #[default]
    Pending,
    /// Voting window open or awaiting tally
    Active,
    /// Tallied with more yes than no
    Succeeded,
    /// Waiting out the timelock
    Queued,
    /// Actions ran
    Executed,
    /// Tallied with yes <= no
    Failed,
}

impl ProposalState {
    /// Counts as approved for the approval oracle.
    pub fn is_approved_state(&self) -> bool {
        matches!(
            self,
            ProposalState::Succeeded | ProposalState::Queued | ProposalState::Executed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalState::Executed | ProposalState::Failed)
    }
}

/// On-chain proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique proposal ID
    pub id: ProposalId,
    /// Proposer address
    pub proposer: Address,
    /// Description
    pub description: String,
    /// Vote-weight snapshot block; votes open the block after
    pub start_block: BlockNumber,
    /// Last block votes are accepted
    pub end_block: BlockNumber,
    /// Quadratic weight in favor
    pub yes_votes: Amount,
    /// Quadratic weight against
    pub no_votes: Amount,
    /// Current state
    pub state: ProposalState,
    /// Earliest execution time, set when queued
    pub timelock_end: Option<Timestamp>,
    /// Executed in order on finalization
    pub actions: Vec<Action>,
    /// Voters that have voted
    voters: BTreeSet<Address>,
}

impl Proposal {
    /// Create an active proposal with a window of `voting_period` blocks.
    pub fn new(
        id: ProposalId,
        proposer: Address,
        description: String,
        actions: Vec<Action>,
        start_block: BlockNumber,
        voting_period: BlockNumber,
    ) -> Self {
        Self {
            id,
            proposer,
            description,
            start_block,
            end_block: start_block.saturating_add(voting_period),
            yes_votes: 0,
            no_votes: 0,
            state: ProposalState::Active,
            timelock_end: None,
            actions,
            voters: BTreeSet::new(),
        }
    }

    /// Whether votes are accepted at `block`. The start block's snapshot is
    /// only final once that block is over, so voting opens the block after.
    pub fn is_voting_open(&self, block: BlockNumber) -> bool {
        self.state == ProposalState::Active && self.start_block < block && block <= self.end_block
    }

    /// Cast a vote with a precomputed weight.
    pub fn cast_vote(
        &mut self,
        voter: Address,
        support: VoteSupport,
        weight: Amount,
        current_block: BlockNumber,
    ) -> Result<(), GovernanceError> {
        if self.state == ProposalState::Active && current_block <= self.start_block {
            return Err(GovernanceError::VotingNotStarted {
                start_block: self.start_block,
                current: current_block,
            });
        }
        if !self.is_voting_open(current_block) {
            return Err(GovernanceError::VotingClosed {
                start_block: self.start_block,
                end_block: self.end_block,
                current: current_block,
            });
        }

        if self.voters.contains(&voter) {
            return Err(GovernanceError::AlreadyVoted);
        }

        match support {
            VoteSupport::For => self.yes_votes = self.yes_votes.saturating_add(weight),
            VoteSupport::Against => self.no_votes = self.no_votes.saturating_add(weight),
        }

        self.voters.insert(voter);
        Ok(())
    }

    /// Tally after the window: Active -> Succeeded or Failed.
    pub fn conclude_voting(&mut self, current_block: BlockNumber) -> Result<ProposalState, GovernanceError> {
        if self.state != ProposalState::Active {
            return Err(GovernanceError::NotExecutable(format!(
                "cannot tally from state {:?}",
                self.state
            )));
        }

        if current_block <= self.end_block {
            return Err(GovernanceError::VotingInProgress {
                end_block: self.end_block,
                current: current_block,
            });
        }

        self.state = if self.yes_votes > self.no_votes {
            ProposalState::Succeeded
        } else {
            ProposalState::Failed
        };
        Ok(self.state)
    }

    /// Succeeded -> Queued, executable from `now + timelock`.
    pub fn queue(&mut self, now: Timestamp, timelock: Timestamp) -> Result<Timestamp, GovernanceError> {
        if self.state != ProposalState::Succeeded {
            return Err(GovernanceError::NotExecutable(format!(
                "cannot queue from state {:?}",
                self.state
            )));
        }

        let ready_at = now.saturating_add(timelock);
        self.timelock_end = Some(ready_at);
        self.state = ProposalState::Queued;
        Ok(ready_at)
    }

    /// Queued -> Executed once the timelock has passed. Returns the actions
    /// the caller must now run; on failure it must call
    /// [`Proposal::abort_execution`].
    pub fn begin_execution(&mut self, now: Timestamp) -> Result<Vec<Action>, GovernanceError> {
        if self.state != ProposalState::Queued {
            return Err(GovernanceError::NotExecutable(format!(
                "cannot execute from state {:?}",
                self.state
            )));
        }

        let ready_at = self.timelock_end.unwrap_or(Timestamp::MAX);
        if now < ready_at {
            return Err(GovernanceError::TimelockNotExpired { ready_at, now });
        }

        self.state = ProposalState::Executed;
        Ok(self.actions.clone())
    }

    /// Undo [`Proposal::begin_execution`], leaving the proposal queued.
    pub fn abort_execution(&mut self) {
        if self.state == ProposalState::Executed {
            self.state = ProposalState::Queued;
        }
    }

    /// Approval oracle predicate.
    pub fn is_approved(&self) -> bool {
        self.yes_votes > self.no_votes && self.state.is_approved_state()
    }

    /// Check if voter has voted.
    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains(voter)
    }

    /// Number of distinct voters.
    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Proposal {
        Proposal::new(1, Address::ZERO, "Test".to_string(), Vec::new(), 100, 50)
    }

    fn voter(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn test_proposal_creation() {
        let p = proposal();
        assert_eq!(p.id, 1);
        assert_eq!(p.state, ProposalState::Active);
        assert_eq!(p.end_block, 150);
        assert_eq!(p.timelock_end, None);
        assert_eq!(ProposalState::default(), ProposalState::Pending);
    }

    #[test]
    fn test_cast_vote() {
        let mut p = proposal();
        p.cast_vote(voter(1), VoteSupport::For, 30, 101).unwrap();
        p.cast_vote(voter(2), VoteSupport::Against, 10, 150).unwrap();

        assert_eq!(p.yes_votes, 30);
        assert_eq!(p.no_votes, 10);
        assert!(p.has_voted(&voter(1)));
        assert_eq!(p.voter_count(), 2);

        // Can't vote twice
        assert_eq!(
            p.cast_vote(voter(1), VoteSupport::Against, 30, 120),
            Err(GovernanceError::AlreadyVoted)
        );
    }

    #[test]
    fn test_vote_outside_window() {
        let mut p = proposal();
        assert!(matches!(
            p.cast_vote(voter(1), VoteSupport::For, 1, 99),
            Err(GovernanceError::VotingNotStarted { start_block: 100, current: 99 })
        ));
        // Not in the snapshot block itself
        assert!(matches!(
            p.cast_vote(voter(1), VoteSupport::For, 1, 100),
            Err(GovernanceError::VotingNotStarted { start_block: 100, current: 100 })
        ));
        assert!(!p.is_voting_open(100));
        assert!(p.is_voting_open(101));
        assert!(matches!(
            p.cast_vote(voter(1), VoteSupport::For, 1, 151),
            Err(GovernanceError::VotingClosed { .. })
        ));
        assert!(!p.has_voted(&voter(1)));
    }

    #[test]
    fn test_conclude_voting() {
        let mut p = proposal();
        p.cast_vote(voter(1), VoteSupport::For, 30, 101).unwrap();

        assert!(matches!(
            p.conclude_voting(150),
            Err(GovernanceError::VotingInProgress { end_block: 150, current: 150 })
        ));
        assert_eq!(p.conclude_voting(151).unwrap(), ProposalState::Succeeded);
        assert!(p.is_approved());
    }

    #[test]
    fn test_tie_fails() {
        let mut p = proposal();
        p.cast_vote(voter(1), VoteSupport::For, 10, 101).unwrap();
        p.cast_vote(voter(2), VoteSupport::Against, 10, 101).unwrap();
        assert_eq!(p.conclude_voting(151).unwrap(), ProposalState::Failed);
        assert!(!p.is_approved());
        assert!(p.state.is_terminal());
    }

    #[test]
    fn test_queue_and_execute() {
        let mut p = proposal();
        p.cast_vote(voter(1), VoteSupport::For, 1, 101).unwrap();

        // Can't queue before tally
        assert!(p.queue(1_000, 60).is_err());

        p.conclude_voting(151).unwrap();
        assert_eq!(p.queue(1_000, 60).unwrap(), 1_060);
        assert_eq!(p.state, ProposalState::Queued);

        assert_eq!(
            p.begin_execution(1_059),
            Err(GovernanceError::TimelockNotExpired { ready_at: 1_060, now: 1_059 })
        );
        p.begin_execution(1_060).unwrap();
        assert_eq!(p.state, ProposalState::Executed);

        // Can't execute again
        assert!(p.begin_execution(2_000).is_err());
    }

    #[test]
    fn test_abort_execution_requeues() {
        let mut p = proposal();
        p.cast_vote(voter(1), VoteSupport::For, 1, 101).unwrap();
        p.conclude_voting(151).unwrap();
        p.queue(0, 0).unwrap();
        p.begin_execution(0).unwrap();

        p.abort_execution();
        assert_eq!(p.state, ProposalState::Queued);
        assert!(p.is_approved());
    }
}
