//! Multisig approval for timelock duration changes.
//!
//! Independent of proposal voting. The first approver to propose sets the
//! pending duration; the rest must propose the same value. A strict
//! majority of the approver set (`n / 2 + 1`) applies it.

use std::collections::BTreeSet;
use covenant_types::{Address, Timestamp};
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// Approver set and the change currently collecting approvals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelockMultisig {
    approvers: BTreeSet<Address>,
    pending_duration: Option<Timestamp>,
    has_approved: BTreeSet<Address>,
}

impl TimelockMultisig {
    pub fn new(approvers: Vec<Address>) -> Result<Self, GovernanceError> {
        let mut multisig = Self::default();
        multisig.replace_approvers(approvers)?;
        Ok(multisig)
    }

    /// Replace the whole approver set. Clears every outstanding approval.
    pub fn replace_approvers(&mut self, approvers: Vec<Address>) -> Result<(), GovernanceError> {
        if approvers.is_empty() {
            return Err(GovernanceError::InvalidApproverSet("approver set is empty".to_string()));
        }

        let mut set = BTreeSet::new();
        for approver in approvers {
            if approver.is_zero() {
                return Err(GovernanceError::ZeroAddress);
            }
            if !set.insert(approver) {
                return Err(GovernanceError::InvalidApproverSet(format!(
                    "duplicate approver {}",
                    approver
                )));
            }
        }

        self.approvers = set;
        self.reset();
        Ok(())
    }

    /// Approve `duration`. Returns `Some(duration)` when this approval
    /// reaches the threshold and the change must be applied.
    pub fn approve(&mut self, approver: Address, duration: Timestamp) -> Result<Option<Timestamp>, GovernanceError> {
        if !self.approvers.contains(&approver) {
            return Err(GovernanceError::NotApprover);
        }

        match self.pending_duration {
            Some(pending) if pending != duration => {
                return Err(GovernanceError::ConflictingTimelockDuration {
                    pending,
                    proposed: duration,
                });
            }
            _ => {}
        }

        if self.has_approved.contains(&approver) {
            return Err(GovernanceError::AlreadyApproved);
        }

        self.pending_duration = Some(duration);
        self.has_approved.insert(approver);

        if self.approval_count() >= self.threshold() {
            self.reset();
            return Ok(Some(duration));
        }
        Ok(None)
    }

    /// Approvals needed: a strict majority.
    pub fn threshold(&self) -> usize {
        self.approvers.len() / 2 + 1
    }

    pub fn approval_count(&self) -> usize {
        self.has_approved.len()
    }

    pub fn pending_duration(&self) -> Option<Timestamp> {
        self.pending_duration
    }

    pub fn has_approved(&self, approver: &Address) -> bool {
        self.has_approved.contains(approver)
    }

    pub fn is_approver(&self, account: &Address) -> bool {
        self.approvers.contains(account)
    }

    pub fn approvers(&self) -> impl Iterator<Item = &Address> {
        self.approvers.iter()
    }

    fn reset(&mut self) {
        self.pending_duration = None;
        self.has_approved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn three() -> TimelockMultisig {
        TimelockMultisig::new(vec![addr(1), addr(2), addr(3)]).unwrap()
    }

    #[test]
    fn test_threshold_is_majority() {
        assert_eq!(three().threshold(), 2);
        assert_eq!(TimelockMultisig::new(vec![addr(1)]).unwrap().threshold(), 1);
        assert_eq!(
            TimelockMultisig::new(vec![addr(1), addr(2), addr(3), addr(4)]).unwrap().threshold(),
            3
        );
    }

    #[test]
    fn test_two_of_three_applies() {
        let mut ms = three();
        assert_eq!(ms.approve(addr(1), 3_600).unwrap(), None);
        assert_eq!(ms.pending_duration(), Some(3_600));
        assert_eq!(ms.approval_count(), 1);

        assert_eq!(ms.approve(addr(2), 3_600).unwrap(), Some(3_600));
        assert_eq!(ms.approval_count(), 0);
        assert_eq!(ms.pending_duration(), None);
        assert!(!ms.has_approved(&addr(1)));
        assert!(!ms.has_approved(&addr(2)));
    }

    #[test]
    fn test_conflicting_duration() {
        let mut ms = three();
        ms.approve(addr(1), 3_600).unwrap();
        assert_eq!(
            ms.approve(addr(2), 7_200),
            Err(GovernanceError::ConflictingTimelockDuration { pending: 3_600, proposed: 7_200 })
        );
        assert_eq!(ms.approval_count(), 1);
    }

    #[test]
    fn test_duplicate_approval() {
        let mut ms = three();
        ms.approve(addr(1), 3_600).unwrap();
        assert_eq!(ms.approve(addr(1), 3_600), Err(GovernanceError::AlreadyApproved));
    }

    #[test]
    fn test_not_approver() {
        let mut ms = three();
        assert_eq!(ms.approve(addr(9), 3_600), Err(GovernanceError::NotApprover));
    }

    #[test]
    fn test_replace_clears_approvals() {
        let mut ms = three();
        ms.approve(addr(1), 3_600).unwrap();

        ms.replace_approvers(vec![addr(1), addr(4)]).unwrap();
        assert_eq!(ms.approval_count(), 0);
        assert_eq!(ms.pending_duration(), None);
        assert!(!ms.has_approved(&addr(1)));
        assert_eq!(ms.threshold(), 2);

        // Removed approver has no say
        assert_eq!(ms.approve(addr(2), 60), Err(GovernanceError::NotApprover));
        // New set may pick a different duration
        assert_eq!(ms.approve(addr(4), 60).unwrap(), None);
        assert_eq!(ms.approve(addr(1), 60).unwrap(), Some(60));
    }

    #[test]
    fn test_invalid_approver_sets() {
        assert!(TimelockMultisig::new(vec![]).is_err());
        assert_eq!(
            TimelockMultisig::new(vec![addr(1), Address::ZERO]).unwrap_err(),
            GovernanceError::ZeroAddress
        );
        assert!(matches!(
            TimelockMultisig::new(vec![addr(1), addr(1)]).unwrap_err(),
            GovernanceError::InvalidApproverSet(_)
        ));
    }
}
