//! Append-only value history keyed by block number.
//!
//! "Balance as of block B" is answered by binary search over the checkpoint
//! list instead of replaying transfers.

use covenant_types::{Amount, BlockNumber};
use serde::{Deserialize, Serialize};
use crate::error::LedgerError;

/// A value recorded at the end of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block: BlockNumber,
    pub value: Amount,
}

/// Position in a [`Checkpoints`] list to roll back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointMark {
    len: usize,
    /// Value of the last entry, which a same-block push overwrites
    last: Option<Checkpoint>,
}

/// Sorted checkpoint list, at most one entry per block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoints {
    history: Vec<Checkpoint>,
}

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` at `block`.
    ///
    /// A second write in the same block overwrites the first. Writing to a
    /// block older than the latest checkpoint is rejected.
    pub fn push(&mut self, block: BlockNumber, value: Amount) -> Result<(), LedgerError> {
        match self.history.last_mut() {
            Some(last) if last.block > block => Err(LedgerError::CheckpointOutOfOrder {
                block,
                latest: last.block,
            }),
            Some(last) if last.block == block => {
                last.value = value;
                Ok(())
            }
            _ => {
                self.history.push(Checkpoint { block, value });
                Ok(())
            }
        }
    }

    /// Most recent value, or zero if nothing was recorded.
    pub fn latest(&self) -> Amount {
        self.history.last().map(|c| c.value).unwrap_or(0)
    }

    /// Value as of `block`: the last checkpoint written at or before it.
    pub fn upper_lookup(&self, block: BlockNumber) -> Amount {
        let idx = self.history.partition_point(|c| c.block <= block);
        if idx == 0 {
            0
        } else {
            self.history[idx - 1].value
        }
    }

    /// Current position, for a later [`Checkpoints::rollback`].
    pub fn mark(&self) -> CheckpointMark {
        CheckpointMark {
            len: self.history.len(),
            last: self.history.last().copied(),
        }
    }

    /// Undo every push made since `mark` was taken.
    pub fn rollback(&mut self, mark: CheckpointMark) {
        self.history.truncate(mark.len);
        if let (Some(last), Some(saved)) = (self.history.last_mut(), mark.last) {
            *last = saved;
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
