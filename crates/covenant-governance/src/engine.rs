//! Governance engine.
//!
//! Owns the proposal registry, quadratic vote tallies and the proposal
//! state machine, plus the multisig that changes the execution timelock.
//!
//! Execution takes two calls. The first call after the voting window tallies
//! the votes and, on success, queues the proposal behind the timelock. A
//! later call, once the timelock has expired, runs the actions in order. If
//! any action fails the proposal stays queued and may be retried.

use std::collections::BTreeMap;
use covenant_ledger::VotingPowerSource;
use covenant_types::{Address, Amount, BlockContext, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::action::{zip_actions, Action, Call};
use crate::config::GovernanceParams;
use crate::error::GovernanceError;
use crate::multisig::TimelockMultisig;
use crate::proposal::{Proposal, ProposalId, ProposalState};
use crate::voting::{quadratic_weight, VoteSupport};

/// Answers whether a proposal has been approved by vote.
pub trait ApprovalOracle {
    fn is_proposal_approved(&self, proposal_id: ProposalId) -> bool;
}

/// Runs proposal actions that target components other than the engine.
pub trait ActionExecutor {
    /// Apply one action. `oracle` reflects the executing proposal as
    /// already executed.
    fn execute(&mut self, action: &Action, oracle: &dyn ApprovalOracle) -> Result<(), GovernanceError>;
}

/// Proposal registry and state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceEngine {
    /// Engine address; proposal-controlled funds are held here
    address: Address,
    /// Identity allowed to replace the approver set
    owner: Address,
    params: GovernanceParams,
    proposals: BTreeMap<ProposalId, Proposal>,
    next_id: ProposalId,
    multisig: TimelockMultisig,
}

impl GovernanceEngine {
    pub fn new(
        address: Address,
        owner: Address,
        params: GovernanceParams,
        approvers: Vec<Address>,
    ) -> Result<Self, GovernanceError> {
        params.validate()?;
        Ok(Self {
            address,
            owner,
            params,
            proposals: BTreeMap::new(),
            next_id: 1,
            multisig: TimelockMultisig::new(approvers)?,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Create a proposal from parallel target/value/call lists.
    ///
    /// The proposer's voting power at the previous block must reach the
    /// proposal threshold. Votes are accepted in blocks
    /// `(ctx.number, ctx.number + voting_period]`.
    #[allow(clippy::too_many_arguments)]
    pub fn create_proposal(
        &mut self,
        proposer: Address,
        description: impl Into<String>,
        targets: Vec<Address>,
        values: Vec<Amount>,
        calls: Vec<Call>,
        ctx: BlockContext,
        power: &dyn VotingPowerSource,
    ) -> Result<ProposalId, GovernanceError> {
        let actual = power.past_voting_power(&proposer, ctx.previous_block());
        if actual < self.params.proposal_threshold {
            return Err(GovernanceError::InsufficientVotingPower {
                actual,
                required: self.params.proposal_threshold,
            });
        }

        let actions = zip_actions(targets, values, calls)?;
        let id = self.next_id;
        let proposal = Proposal::new(
            id,
            proposer,
            description.into(),
            actions,
            ctx.number,
            self.params.voting_period,
        );

        info!(
            id,
            proposer = %proposer,
            start_block = proposal.start_block,
            end_block = proposal.end_block,
            actions = proposal.actions.len(),
            "proposal created"
        );

        self.proposals.insert(id, proposal);
        self.next_id += 1;
        Ok(id)
    }

    /// Cast a vote. Weight is the square root of the voter's power at the
    /// proposal's start block. Returns the weight applied.
    pub fn vote(
        &mut self,
        voter: Address,
        proposal_id: ProposalId,
        support: VoteSupport,
        ctx: BlockContext,
        power: &dyn VotingPowerSource,
    ) -> Result<Amount, GovernanceError> {
        let proposal = self.proposal_mut(proposal_id)?;
        let weight = quadratic_weight(power.past_voting_power(&voter, proposal.start_block));

        proposal.cast_vote(voter, support, weight, ctx.number)?;

        info!(proposal = proposal_id, voter = %voter, ?support, weight, "vote cast");
        Ok(weight)
    }

    /// Advance a proposal by exactly one step.
    ///
    /// Active proposals are tallied and either queued or failed; queued
    /// proposals run their actions once the timelock has expired. Returns
    /// the state the proposal is left in.
    pub fn execute_proposal(
        &mut self,
        proposal_id: ProposalId,
        ctx: BlockContext,
        executor: &mut dyn ActionExecutor,
    ) -> Result<ProposalState, GovernanceError> {
        let timelock = self.params.timelock_duration;
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))?;

        let state = proposal.state;
        match state {
            ProposalState::Executed => Err(GovernanceError::AlreadyExecuted),
            ProposalState::Failed => Err(GovernanceError::ProposalFailed(proposal_id)),
            ProposalState::Active => {
                let tallied = proposal.conclude_voting(ctx.number)?;
                if tallied == ProposalState::Failed {
                    info!(
                        proposal = proposal_id,
                        yes = proposal.yes_votes,
                        no = proposal.no_votes,
                        "proposal failed"
                    );
                    return Ok(ProposalState::Failed);
                }

                let ready_at = proposal.queue(ctx.timestamp, timelock)?;
                info!(
                    proposal = proposal_id,
                    yes = proposal.yes_votes,
                    no = proposal.no_votes,
                    ready_at,
                    "proposal succeeded and queued"
                );
                Ok(ProposalState::Queued)
            }
            ProposalState::Queued => self.finalize(proposal_id, ctx, executor),
            state => Err(GovernanceError::NotExecutable(format!(
                "proposal {} is {:?}",
                proposal_id, state
            ))),
        }
    }

    fn finalize(
        &mut self,
        proposal_id: ProposalId,
        ctx: BlockContext,
        executor: &mut dyn ActionExecutor,
    ) -> Result<ProposalState, GovernanceError> {
        let actions = self.proposal_mut(proposal_id)?.begin_execution(ctx.timestamp)?;
        let saved_params = self.params.clone();

        for (index, action) in actions.iter().enumerate() {
            let result = if action.target == self.address && action.call.is_parameter_change() {
                self.apply_parameter_change(action)
            } else {
                executor.execute(action, &*self)
            };

            if let Err(e) = result {
                self.params = saved_params;
                if let Some(proposal) = self.proposals.get_mut(&proposal_id) {
                    proposal.abort_execution();
                }
                warn!(proposal = proposal_id, index, error = %e, "proposal action failed, execution aborted");
                return Err(GovernanceError::ExecutionFailed {
                    index,
                    reason: e.to_string(),
                });
            }
            debug!(proposal = proposal_id, index, target = %action.target, "action executed");
        }

        info!(proposal = proposal_id, actions = actions.len(), "proposal executed");
        Ok(ProposalState::Executed)
    }

    fn apply_parameter_change(&mut self, action: &Action) -> Result<(), GovernanceError> {
        if action.value != 0 {
            return Err(GovernanceError::InvalidParameter(
                "parameter changes carry no value".to_string(),
            ));
        }

        match action.call {
            Call::SetProposalThreshold { threshold } => {
                self.params.proposal_threshold = threshold;
                info!(threshold, "proposal threshold changed");
            }
            Call::SetVotingPeriod { blocks } => {
                if blocks == 0 {
                    return Err(GovernanceError::InvalidParameter(
                        "voting_period must be > 0".to_string(),
                    ));
                }
                self.params.voting_period = blocks;
                info!(blocks, "voting period changed");
            }
            _ => {
                return Err(GovernanceError::InvalidParameter(format!(
                    "{:?} is not a parameter change",
                    action.call
                )))
            }
        }
        Ok(())
    }

    /// Approve a timelock duration change as one of the approvers. Returns
    /// the new duration when this approval applied it.
    pub fn propose_timelock_duration_change(
        &mut self,
        approver: Address,
        duration: Timestamp,
    ) -> Result<Option<Timestamp>, GovernanceError> {
        let applied = self.multisig.approve(approver, duration)?;

        match applied {
            Some(duration) => {
                let previous = self.params.timelock_duration;
                self.params.timelock_duration = duration;
                info!(previous, duration, "timelock duration changed");
            }
            None => {
                info!(
                    approver = %approver,
                    duration,
                    approvals = self.multisig.approval_count(),
                    threshold = self.multisig.threshold(),
                    "timelock change approved"
                );
            }
        }
        Ok(applied)
    }

    /// Replace the approver set. Owner only; clears pending approvals.
    pub fn set_approvers(&mut self, caller: Address, approvers: Vec<Address>) -> Result<(), GovernanceError> {
        if caller != self.owner {
            return Err(GovernanceError::Unauthorized(
                "only the governance owner may replace approvers".to_string(),
            ));
        }
        self.multisig.replace_approvers(approvers)?;
        info!(
            approvers = self.multisig.approvers().count(),
            threshold = self.multisig.threshold(),
            "approver set replaced"
        );
        Ok(())
    }

    pub fn proposal(&self, proposal_id: ProposalId) -> Result<&Proposal, GovernanceError> {
        self.proposals
            .get(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }

    pub fn state(&self, proposal_id: ProposalId) -> Result<ProposalState, GovernanceError> {
        Ok(self.proposal(proposal_id)?.state)
    }

    pub fn has_voted(&self, proposal_id: ProposalId, voter: &Address) -> bool {
        self.proposals
            .get(&proposal_id)
            .map_or(false, |p| p.has_voted(voter))
    }

    /// Number of proposals ever created.
    pub fn proposal_count(&self) -> u64 {
        self.next_id - 1
    }

    /// All proposals by id.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn approvers(&self) -> Vec<Address> {
        self.multisig.approvers().copied().collect()
    }

    pub fn approval_threshold(&self) -> usize {
        self.multisig.threshold()
    }

    /// Pending timelock duration and its approval count.
    pub fn pending_timelock_change(&self) -> Option<(Timestamp, usize)> {
        self.multisig
            .pending_duration()
            .map(|d| (d, self.multisig.approval_count()))
    }

    pub fn multisig(&self) -> &TimelockMultisig {
        &self.multisig
    }

    fn proposal_mut(&mut self, proposal_id: ProposalId) -> Result<&mut Proposal, GovernanceError> {
        self.proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }
}

impl ApprovalOracle for GovernanceEngine {
    fn is_proposal_approved(&self, proposal_id: ProposalId) -> bool {
        self.proposals
            .get(&proposal_id)
            .map_or(false, Proposal::is_approved)
    }
}
