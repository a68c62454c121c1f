//! Reentrancy protection for entry points that move funds.
//!
//! Tracks which entry points are currently executing and rejects a nested
//! call into one that is already on the stack.

use crate::error::GovernanceError;

/// Stack of entry points currently executing.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    stack: Vec<&'static str>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `entry`. Fails if it is already on the stack.
    pub fn enter(&mut self, entry: &'static str) -> Result<usize, GovernanceError> {
        if self.contains(entry) {
            return Err(GovernanceError::Reentrancy(entry));
        }
        self.stack.push(entry);
        Ok(self.stack.len() - 1)
    }

    /// Leave the innermost entry point.
    pub fn exit(&mut self) -> Option<&'static str> {
        self.stack.pop()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.stack.iter().any(|e| *e == entry)
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run `f` with `entry` held for its duration. The entry is released
    /// whether `f` succeeds or not.
    pub fn guarded<T, F>(&mut self, entry: &'static str, f: F) -> Result<T, GovernanceError>
    where
        F: FnOnce() -> Result<T, GovernanceError>,
    {
        self.enter(entry)?;
        let result = f();
        self.exit();
        result
    }
}
