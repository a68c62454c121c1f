//! Covenant Types - Core type definitions shared by the Covenant crates.
//!
//! This crate provides:
//! - Addresses (20-byte, Bech32m encoded)
//! - Token amounts, block numbers and timestamps
//! - The block context every state transition is evaluated against

pub mod address;
pub mod primitives;
pub mod error;

#[cfg(feature = "serde")]
pub mod serialization;

pub use address::Address;
pub use primitives::{parse_amount, parse_duration, Amount, BlockContext, BlockNumber, Timestamp, DAY, TOKEN};
pub use error::TypesError;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, Amount, BlockContext, BlockNumber, Timestamp, TypesError};
}
