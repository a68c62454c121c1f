//! Covenant Ledger - token balances and vesting.
//!
//! This crate provides:
//! - The ledger interfaces the governance layer consumes
//! - A checkpointed reference token answering historical voting-power queries
//! - The transfer guard that keeps unvested tokens from moving
//! - The vesting schedule engine

pub mod checkpoint;
pub mod interfaces;
pub mod token;
pub mod guard;
pub mod vesting;
pub mod error;

pub use checkpoint::{Checkpoint, CheckpointMark, Checkpoints};
pub use interfaces::{LockedBalanceSource, TokenLedger, VotingPowerSource};
pub use token::CheckpointedToken;
pub use guard::{GuardedToken, PrivilegedRole, TransferGuard};
pub use vesting::{VestingLedger, VestingSchedule};
pub use error::LedgerError;
