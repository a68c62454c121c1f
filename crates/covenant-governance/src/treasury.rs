//! Treasury management for governance funds.
//!
//! Every disbursement is a fund request backed by a governance proposal
//! whose single action calls back into [`Treasury::execute_fund_request`].
//! Funds only move once the approval oracle reports the proposal approved.

use std::collections::BTreeMap;
use covenant_ledger::{TokenLedger, VotingPowerSource};
use covenant_types::{Address, Amount, BlockContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::action::Call;
use crate::engine::{ApprovalOracle, GovernanceEngine};
use crate::error::GovernanceError;
use crate::proposal::ProposalId;
use crate::reentrancy::ReentrancyGuard;

/// Fund request identifier.
pub type RequestId = u64;

/// A request to pay treasury funds to a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRequest {
    pub request_id: RequestId,
    /// Who asked for the funds
    pub requester: Address,
    #[serde(with = "covenant_types::serialization::amount")]
    pub amount: Amount,
    pub recipient: Address,
    pub description: String,
    /// Set once, when the funds are paid out
    pub executed: bool,
    /// Backing proposal
    pub proposal_id: ProposalId,
}

/// Governed fund disbursement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treasury {
    /// Treasury address; holds the funds
    address: Address,
    requests: BTreeMap<RequestId, FundRequest>,
    by_proposal: BTreeMap<ProposalId, RequestId>,
    next_request_id: RequestId,
    #[serde(skip)]
    reentrancy: ReentrancyGuard,
}

impl Treasury {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            requests: BTreeMap::new(),
            by_proposal: BTreeMap::new(),
            next_request_id: 1,
            reentrancy: ReentrancyGuard::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Open a fund request and its backing proposal. The treasury itself is
    /// the proposer. Returns the proposal id.
    ///
    /// The treasury balance is not checked here; an underfunded request
    /// fails when executed.
    #[allow(clippy::too_many_arguments)]
    pub fn create_fund_request(
        &mut self,
        requester: Address,
        amount: Amount,
        recipient: Address,
        description: impl Into<String>,
        ctx: BlockContext,
        engine: &mut GovernanceEngine,
        power: &dyn VotingPowerSource,
    ) -> Result<ProposalId, GovernanceError> {
        if amount == 0 {
            return Err(GovernanceError::ZeroAmount);
        }
        if recipient.is_zero() {
            return Err(GovernanceError::ZeroAddress);
        }

        let description = description.into();
        let request_id = self.next_request_id;
        let proposal_id = engine.create_proposal(
            self.address,
            description.clone(),
            vec![self.address],
            vec![0],
            vec![Call::ExecuteFundRequest { request_id }],
            ctx,
            power,
        )?;

        self.requests.insert(
            request_id,
            FundRequest {
                request_id,
                requester,
                amount,
                recipient,
                description,
                executed: false,
                proposal_id,
            },
        );
        self.by_proposal.insert(proposal_id, request_id);
        self.next_request_id += 1;

        info!(
            request = request_id,
            proposal = proposal_id,
            requester = %requester,
            recipient = %recipient,
            amount,
            "fund request created"
        );
        Ok(proposal_id)
    }

    /// Pay out an approved fund request. Returns the amount paid.
    ///
    /// Anyone may call this once the oracle approves the backing proposal,
    /// and the engine reports Queued proposals as approved. A request paid
    /// this way before the timelock expires leaves its proposal Queued: the
    /// proposal's own action then fails with `RequestAlreadyExecuted`.
    pub fn execute_fund_request(
        &mut self,
        request_id: RequestId,
        oracle: &dyn ApprovalOracle,
        token: &mut dyn TokenLedger,
    ) -> Result<Amount, GovernanceError> {
        let Self { address, requests, reentrancy, .. } = self;
        reentrancy.guarded("execute_fund_request", || {
            pay_out(*address, requests, request_id, oracle, token)
        })
    }

    pub fn fund_request(&self, request_id: RequestId) -> Result<&FundRequest, GovernanceError> {
        self.requests
            .get(&request_id)
            .ok_or(GovernanceError::RequestNotFound(request_id))
    }

    /// Number of requests ever created.
    pub fn request_count(&self) -> u64 {
        self.next_request_id - 1
    }

    /// Request backed by `proposal_id`, if any.
    pub fn request_for_proposal(&self, proposal_id: ProposalId) -> Option<&FundRequest> {
        self.by_proposal
            .get(&proposal_id)
            .and_then(|id| self.requests.get(id))
    }

    pub fn requests(&self) -> impl Iterator<Item = &FundRequest> {
        self.requests.values()
    }
}

fn pay_out(
    treasury: Address,
    requests: &mut BTreeMap<RequestId, FundRequest>,
    request_id: RequestId,
    oracle: &dyn ApprovalOracle,
    token: &mut dyn TokenLedger,
) -> Result<Amount, GovernanceError> {
    let request = requests
        .get_mut(&request_id)
        .ok_or(GovernanceError::RequestNotFound(request_id))?;

    if request.executed {
        return Err(GovernanceError::RequestAlreadyExecuted(request_id));
    }
    if request.amount == 0 {
        return Err(GovernanceError::ZeroAmount);
    }
    if !oracle.is_proposal_approved(request.proposal_id) {
        return Err(GovernanceError::ProposalNotApproved(request.proposal_id));
    }

    request.executed = true;
    let (amount, recipient) = (request.amount, request.recipient);

    if let Err(e) = token.transfer(treasury, recipient, amount) {
        request.executed = false;
        debug!(request = request_id, error = %e, "fund request transfer failed, rolled back");
        return Err(GovernanceError::TransferFailed(e.to_string()));
    }

    info!(request = request_id, recipient = %recipient, amount, "fund request executed");
    Ok(amount)
}
