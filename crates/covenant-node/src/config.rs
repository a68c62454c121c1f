//! Genesis configuration.
//!
//! Handles loading and validation of the DAO genesis file: identities,
//! governance parameters, approvers, initial allocations and vesting
//! schedules.

use covenant_governance::GovernanceParams;
use covenant_types::serialization::duration;
use covenant_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Genesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Deployment name
    pub name: String,
    /// Token ticker
    pub symbol: String,
    /// Timelock multisig approvers
    pub approvers: Vec<String>,
    /// Clock at genesis
    pub clock: ClockConfig,
    /// Well-known identities
    pub identities: IdentitiesConfig,
    /// Governance parameters
    pub governance: GovernanceParams,
    /// Tokens minted at genesis
    pub allocations: Vec<AllocationConfig>,
    /// Vesting schedules created at genesis
    pub schedules: Vec<ScheduleConfig>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            name: "covenant-devnet".to_string(),
            symbol: "COV".to_string(),
            approvers: vec!["approver-1".to_string(), "approver-2".to_string(), "approver-3".to_string()],
            clock: ClockConfig::default(),
            identities: IdentitiesConfig::default(),
            governance: GovernanceParams::default(),
            allocations: Vec::new(),
            schedules: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GenesisConfig {
    /// Load configuration from file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: GenesisConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.governance.validate()?;

        if self.approvers.is_empty() {
            anyhow::bail!("At least one approver is required");
        }

        let ids = &self.identities;
        let mut seen = std::collections::BTreeSet::new();
        for name in [&ids.owner, &ids.governance, &ids.treasury, &ids.vesting_pool]
            .into_iter()
            .chain(ids.staking_sink.as_ref())
        {
            if !seen.insert(resolve(name)?) {
                anyhow::bail!("Identity '{}' is used for more than one role", name);
            }
        }

        for approver in &self.approvers {
            resolve(approver)?;
        }

        for allocation in &self.allocations {
            resolve(&allocation.to)?;
            if allocation.amount == 0 {
                anyhow::bail!("Allocation to '{}' is zero", allocation.to);
            }
        }

        for schedule in &self.schedules {
            resolve(&schedule.beneficiary)?;
            if schedule.cliff > schedule.duration {
                anyhow::bail!(
                    "Schedule for '{}' has a cliff longer than its duration",
                    schedule.beneficiary
                );
            }
        }

        Ok(())
    }
}

/// Clock at genesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// First block number
    pub block: u64,
    /// Unix time of the first block
    pub timestamp: Timestamp,
    /// Seconds per block when a step only advances blocks
    pub block_time: Timestamp,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            block: 1,
            timestamp: 1_700_000_000,
            block_time: 12,
        }
    }
}

/// Identities by name. A name is either an encoded address (`cov1...` or
/// `0x...`) or a label hashed into one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitiesConfig {
    pub owner: String,
    pub governance: String,
    pub treasury: String,
    pub vesting_pool: String,
    pub staking_sink: Option<String>,
}

impl Default for IdentitiesConfig {
    fn default() -> Self {
        Self {
            owner: "owner".to_string(),
            governance: "governance".to_string(),
            treasury: "treasury".to_string(),
            vesting_pool: "vesting".to_string(),
            staking_sink: None,
        }
    }
}

/// Tokens minted to an identity at genesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub to: String,
    #[serde(with = "covenant_types::serialization::amount")]
    pub amount: Amount,
}

/// Vesting schedule created at genesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub beneficiary: String,
    /// Start time; defaults to the genesis timestamp
    #[serde(default)]
    pub start: Option<Timestamp>,
    #[serde(with = "duration")]
    pub cliff: Timestamp,
    #[serde(with = "duration")]
    pub duration: Timestamp,
    #[serde(with = "covenant_types::serialization::amount")]
    pub amount: Amount,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log to file
    pub log_file: Option<PathBuf>,
    /// Log format (json|pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
            format: "pretty".to_string(),
        }
    }
}

/// Resolve an identity name to an address.
pub fn resolve(name: &str) -> anyhow::Result<Address> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Empty identity name");
    }
    if name.starts_with("cov1") || name.starts_with("0x") {
        return Address::from_str(name)
            .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", name, e));
    }
    Ok(Address::from_label(name))
}
