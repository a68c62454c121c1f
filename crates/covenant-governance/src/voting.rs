//! Quadratic vote weighting.
//!
//! Vote weight = floor(sqrt(voting power)), so a holder with 100x the tokens
//! gets 10x the say.

use covenant_types::Amount;
use serde::{Deserialize, Serialize};

/// Vote direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteSupport {
    /// Vote in favor
    For,
    /// Vote against
    Against,
}

impl From<bool> for VoteSupport {
    fn from(support: bool) -> Self {
        if support {
            VoteSupport::For
        } else {
            VoteSupport::Against
        }
    }
}

/// Integer square root using Newton's method.
/// Returns floor(sqrt(n)).
pub fn integer_sqrt(n: Amount) -> Amount {
    if n <= 1 {
        return n;
    }

    let mut x = n;
    // ceil(n / 2) without overflowing on u128::MAX
    let mut y = n / 2 + n % 2;

    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }

    x
}

/// Weight a vote carries for the given raw voting power.
pub fn quadratic_weight(voting_power: Amount) -> Amount {
    integer_sqrt(voting_power)
}
