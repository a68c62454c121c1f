//! Proposal actions.
//!
//! An action is a (target, value, call) triple. Instead of opaque call data
//! the call is a closed set of effects, so every executable proposal can be
//! audited before it runs.

use covenant_types::{Address, Amount, BlockNumber};
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// Effect requested of the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Call {
    /// No call; only `value` moves to the target
    Transfer,
    /// Treasury entry point paying out a fund request
    ExecuteFundRequest { request_id: u64 },
    /// Governance parameter: voting power needed to propose
    SetProposalThreshold {
        #[serde(with = "covenant_types::serialization::amount")]
        threshold: Amount,
    },
    /// Governance parameter: voting window length in blocks
    SetVotingPeriod { blocks: BlockNumber },
}

impl Call {
    /// Whether this call changes the governance engine's own parameters.
    pub fn is_parameter_change(&self) -> bool {
        matches!(self, Call::SetProposalThreshold { .. } | Call::SetVotingPeriod { .. })
    }
}

/// One step of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Receiving component
    pub target: Address,
    /// Tokens moved from the governance engine to the target before the call
    #[serde(with = "covenant_types::serialization::amount")]
    pub value: Amount,
    /// Requested effect
    pub call: Call,
}

impl Action {
    pub fn new(target: Address, value: Amount, call: Call) -> Self {
        Self { target, value, call }
    }
}

/// Zip parallel target/value/call lists into actions.
pub fn zip_actions(
    targets: Vec<Address>,
    values: Vec<Amount>,
    calls: Vec<Call>,
) -> Result<Vec<Action>, GovernanceError> {
    if targets.len() != values.len() || targets.len() != calls.len() {
        return Err(GovernanceError::MismatchedActionLengths {
            targets: targets.len(),
            values: values.len(),
            calls: calls.len(),
        });
    }

    Ok(targets
        .into_iter()
        .zip(values)
        .zip(calls)
        .map(|((target, value), call)| Action { target, value, call })
        .collect())
}
