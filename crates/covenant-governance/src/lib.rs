//! Covenant Governance - proposals, quadratic voting and the treasury.
//!
//! This crate provides:
//! - Proposal lifecycle management with timelocked, two-step execution
//! - Quadratic vote weighting over historical voting power
//! - Multisig approval of timelock duration changes
//! - Treasury fund requests backed by proposals
//! - The DAO runtime composing all of the above with the ledger crate

pub mod action;
pub mod config;
pub mod dao;
pub mod engine;
pub mod multisig;
pub mod proposal;
pub mod reentrancy;
pub mod treasury;
pub mod voting;
pub mod error;

pub use action::{zip_actions, Action, Call};
pub use config::GovernanceParams;
pub use dao::{Dao, DaoIdentities, DaoState, Footprint};
pub use engine::{ActionExecutor, ApprovalOracle, GovernanceEngine};
pub use multisig::TimelockMultisig;
pub use proposal::{Proposal, ProposalId, ProposalState};
pub use treasury::{FundRequest, RequestId, Treasury};
pub use voting::{integer_sqrt, quadratic_weight, VoteSupport};
pub use error::GovernanceError;
