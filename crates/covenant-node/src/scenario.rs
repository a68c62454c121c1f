//! Scenario scripts.
//!
//! A scenario is a TOML list of `[[step]]` tables, each naming an operation
//! in its `op` key. Identities are names resolved like the genesis file.

use covenant_governance::{Call, VoteSupport};
use covenant_types::{Amount, BlockNumber, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::Path;
use covenant_types::serialization::duration;

/// A scripted sequence of operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read scenario '{}': {}", path.display(), e))?;
        Self::from_toml(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse scenario '{}': {}", path.display(), e))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// One operation plus its expected outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub op: Op,
    /// The step must fail; if set to a string, the error must contain it
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

/// Expected rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectError {
    Any(bool),
    Containing(String),
}

impl ExpectError {
    /// Whether a failure is expected at all.
    pub fn expects_failure(&self) -> bool {
        match self {
            ExpectError::Any(flag) => *flag,
            ExpectError::Containing(_) => true,
        }
    }

    /// Whether `error` satisfies the expectation.
    pub fn matches(&self, error: &str) -> bool {
        match self {
            ExpectError::Any(flag) => *flag,
            ExpectError::Containing(needle) => error.contains(needle.as_str()),
        }
    }
}

/// A proposal action with a named target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub target: String,
    #[serde(default, with = "covenant_types::serialization::amount")]
    pub value: Amount,
    pub call: Call,
}

/// Scriptable operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Op {
    /// Move the clock; `seconds` defaults to `blocks * block_time`
    Advance {
        #[serde(default)]
        blocks: BlockNumber,
        #[serde(default, with = "option_duration")]
        seconds: Option<Timestamp>,
    },
    Mint {
        to: String,
        #[serde(with = "covenant_types::serialization::amount")]
        amount: Amount,
    },
    Transfer {
        from: String,
        to: String,
        #[serde(with = "covenant_types::serialization::amount")]
        amount: Amount,
    },
    Propose {
        proposer: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        actions: Vec<ActionSpec>,
    },
    Vote {
        voter: String,
        proposal: u64,
        support: VoteSupport,
    },
    ExecuteProposal {
        #[serde(default = "anyone")]
        caller: String,
        proposal: u64,
    },
    ProposeFundRequest {
        requester: String,
        recipient: String,
        #[serde(with = "covenant_types::serialization::amount")]
        amount: Amount,
        #[serde(default)]
        description: String,
    },
    ExecuteFundRequest {
        #[serde(default = "anyone")]
        caller: String,
        request: u64,
    },
    CreateSchedule {
        caller: Option<String>,
        beneficiary: String,
        /// Defaults to the current time
        start: Option<Timestamp>,
        #[serde(with = "duration")]
        cliff: Timestamp,
        #[serde(with = "duration")]
        duration: Timestamp,
        #[serde(with = "covenant_types::serialization::amount")]
        amount: Amount,
    },
    Release {
        beneficiary: String,
        #[serde(default)]
        index: usize,
    },
    ProposeTimelockChange {
        approver: String,
        #[serde(with = "duration")]
        duration: Timestamp,
    },
    SetApprovers {
        caller: Option<String>,
        approvers: Vec<String>,
    },
    /// Assert a balance
    CheckBalance {
        account: String,
        #[serde(with = "covenant_types::serialization::amount")]
        amount: Amount,
    },
}

impl Op {
    /// Kebab-case operation name.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Advance { .. } => "advance",
            Op::Mint { .. } => "mint",
            Op::Transfer { .. } => "transfer",
            Op::Propose { .. } => "propose",
            Op::Vote { .. } => "vote",
            Op::ExecuteProposal { .. } => "execute-proposal",
            Op::ProposeFundRequest { .. } => "propose-fund-request",
            Op::ExecuteFundRequest { .. } => "execute-fund-request",
            Op::CreateSchedule { .. } => "create-schedule",
            Op::Release { .. } => "release",
            Op::ProposeTimelockChange { .. } => "propose-timelock-change",
            Op::SetApprovers { .. } => "set-approvers",
            Op::CheckBalance { .. } => "check-balance",
        }
    }
}

fn anyone() -> String {
    "anyone".to_string()
}

mod option_duration {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Timestamp>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
    where
        D: Deserializer<'de>,
    {
        duration::deserialize(deserializer).map(Some)
    }
}
