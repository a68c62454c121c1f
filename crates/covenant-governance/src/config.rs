//! Governance parameters.

use covenant_types::{Amount, BlockNumber, Timestamp, DAY, TOKEN};
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// Tunable governance parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Raw voting power (at the previous block) needed to create a proposal
    #[serde(with = "covenant_types::serialization::amount")]
    pub proposal_threshold: Amount,
    /// Voting window length in blocks
    pub voting_period: BlockNumber,
    /// Delay between queueing and execution, in seconds
    #[serde(with = "covenant_types::serialization::duration")]
    pub timelock_duration: Timestamp,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            proposal_threshold: 1_000 * TOKEN,
            voting_period: 17_280, // ~3 days of 15s blocks
            timelock_duration: 2 * DAY,
        }
    }
}

impl GovernanceParams {
    /// Validate parameters.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.voting_period == 0 {
            return Err(GovernanceError::InvalidParameter(
                "voting_period must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = GovernanceParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.timelock_duration, 172_800);
    }

    #[test]
    fn test_zero_voting_period_rejected() {
        let params = GovernanceParams {
            voting_period: 0,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(GovernanceError::InvalidParameter(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: GovernanceParams =
            serde_json::from_str(r#"{"proposal_threshold": "5tok", "voting_period": 10}"#).unwrap();
        assert_eq!(params.proposal_threshold, 5 * TOKEN);
        assert_eq!(params.voting_period, 10);
        assert_eq!(params.timelock_duration, 2 * DAY);
    }

    #[test]
    fn test_timelock_accepts_suffixed_duration() {
        let params: GovernanceParams =
            serde_json::from_str(r#"{"timelock_duration": "2d"}"#).unwrap();
        assert_eq!(params.timelock_duration, 2 * DAY);

        let params: GovernanceParams =
            serde_json::from_str(r#"{"timelock_duration": 90}"#).unwrap();
        assert_eq!(params.timelock_duration, 90);
        assert!(serde_json::from_str::<GovernanceParams>(r#"{"timelock_duration": "soon"}"#).is_err());
    }
}
