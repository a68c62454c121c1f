//! Scenario runner.
//!
//! Builds a [`Dao`] from a genesis config and replays scenario steps
//! against it, recording the outcome of each.

use std::collections::BTreeMap;
use covenant_governance::{Dao, DaoIdentities};
use covenant_types::{Address, Amount, BlockContext, Timestamp};
use serde::Serialize;
use tracing::{debug, info, warn};
use crate::config::{resolve, GenesisConfig};
use crate::scenario::{Op, Scenario, Step};

/// Result of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub block: u64,
    pub timestamp: Timestamp,
    /// Success detail or error message
    pub outcome: Outcome,
    /// Outcome matched the step's expectation
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "detail")]
pub enum Outcome {
    Ok(String),
    Err(String),
}

/// Drives a DAO through scripted steps.
pub struct Runner {
    dao: Dao,
    block_time: Timestamp,
    names: BTreeMap<Address, String>,
}

impl Runner {
    /// Build the DAO described by `config`: mint allocations, then create
    /// schedules.
    pub fn from_genesis(config: &GenesisConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let mut names = BTreeMap::new();
        let mut name = |label: &str| -> anyhow::Result<Address> {
            let address = resolve(label)?;
            names.entry(address).or_insert_with(|| label.to_string());
            Ok(address)
        };

        let ids = &config.identities;
        let identities = DaoIdentities {
            owner: name(&ids.owner)?,
            governance: name(&ids.governance)?,
            treasury: name(&ids.treasury)?,
            vesting_pool: name(&ids.vesting_pool)?,
            staking_sink: ids.staking_sink.as_deref().map(&mut name).transpose()?,
        };
        let approvers = config
            .approvers
            .iter()
            .map(|a| name(a))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let genesis = BlockContext::new(config.clock.block, config.clock.timestamp);
        let owner = identities.owner;
        let mut dao = Dao::new(
            identities,
            config.governance.clone(),
            approvers,
            config.symbol.clone(),
            genesis,
        )?;

        for allocation in &config.allocations {
            let to = name(&allocation.to)?;
            dao.mint(owner, to, allocation.amount)?;
        }

        for schedule in &config.schedules {
            let beneficiary = name(&schedule.beneficiary)?;
            dao.create_vesting_schedule(
                owner,
                beneficiary,
                schedule.start.unwrap_or(genesis.timestamp),
                schedule.cliff,
                schedule.duration,
                schedule.amount,
            )?;
        }

        info!(
            name = %config.name,
            allocations = config.allocations.len(),
            schedules = config.schedules.len(),
            supply = dao.token().total_supply(),
            "genesis applied"
        );

        // Genesis balances become voting power from the next block on
        dao.advance(1, config.clock.block_time)?;

        Ok(Self {
            dao,
            block_time: config.clock.block_time,
            names,
        })
    }

    pub fn dao(&self) -> &Dao {
        &self.dao
    }

    /// Run every step. Stops at nothing: each step is reported.
    pub fn run(&mut self, scenario: &Scenario) -> Vec<StepReport> {
        scenario
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| self.run_step(index, step))
            .collect()
    }

    /// Run one step and judge it against its expectation.
    pub fn run_step(&mut self, index: usize, step: &Step) -> StepReport {
        let op = step.op.name();
        let outcome = match self.apply(&step.op) {
            Ok(detail) => Outcome::Ok(detail),
            Err(e) => Outcome::Err(e.to_string()),
        };

        let passed = match (&outcome, &step.expect_error) {
            (Outcome::Ok(_), None) => true,
            (Outcome::Ok(_), Some(expected)) => !expected.expects_failure(),
            (Outcome::Err(_), None) => false,
            (Outcome::Err(e), Some(expected)) => expected.matches(e),
        };

        let ctx = self.dao.ctx();
        if passed {
            debug!(index, op, ?outcome, "step passed");
        } else {
            warn!(index, op, ?outcome, "step did not match expectation");
        }

        StepReport {
            index,
            op,
            block: ctx.number,
            timestamp: ctx.timestamp,
            outcome,
            passed,
        }
    }

    fn apply(&mut self, op: &Op) -> anyhow::Result<String> {
        let owner = self.dao.identities().owner;
        match op {
            Op::Advance { blocks, seconds } => {
                let seconds = seconds.unwrap_or(blocks.saturating_mul(self.block_time));
                let ctx = self.dao.advance(*blocks, seconds)?;
                Ok(format!("block {} at {}", ctx.number, ctx.timestamp))
            }
            Op::Mint { to, amount } => {
                let to = self.name(to)?;
                self.dao.mint(owner, to, *amount)?;
                Ok(format!("minted {}", amount))
            }
            Op::Transfer { from, to, amount } => {
                let (from, to) = (self.name(from)?, self.name(to)?);
                self.dao.transfer(from, to, *amount)?;
                Ok(format!("moved {}", amount))
            }
            Op::Propose { proposer, description, actions } => {
                let proposer = self.name(proposer)?;
                let mut targets = Vec::with_capacity(actions.len());
                let mut values = Vec::with_capacity(actions.len());
                let mut calls = Vec::with_capacity(actions.len());
                for action in actions {
                    targets.push(self.name(&action.target)?);
                    values.push(action.value);
                    calls.push(action.call.clone());
                }
                let id = self
                    .dao
                    .create_proposal(proposer, description.clone(), targets, values, calls)?;
                Ok(format!("proposal {}", id))
            }
            Op::Vote { voter, proposal, support } => {
                let voter = self.name(voter)?;
                let weight = self.dao.vote(voter, *proposal, *support)?;
                Ok(format!("weight {}", weight))
            }
            Op::ExecuteProposal { caller, proposal } => {
                let caller = self.name(caller)?;
                let state = self.dao.execute_proposal(caller, *proposal)?;
                Ok(format!("{:?}", state))
            }
            Op::ProposeFundRequest { requester, recipient, amount, description } => {
                let (requester, recipient) = (self.name(requester)?, self.name(recipient)?);
                let id = self
                    .dao
                    .propose_fund_request(requester, *amount, recipient, description.clone())?;
                let request = self
                    .dao
                    .treasury()
                    .request_for_proposal(id)
                    .map(|r| r.request_id)
                    .unwrap_or_default();
                Ok(format!("request {} proposal {}", request, id))
            }
            Op::ExecuteFundRequest { caller, request } => {
                let caller = self.name(caller)?;
                let paid = self.dao.execute_fund_request(caller, *request)?;
                Ok(format!("paid {}", paid))
            }
            Op::CreateSchedule { caller, beneficiary, start, cliff, duration, amount } => {
                let caller = match caller {
                    Some(c) => self.name(c)?,
                    None => owner,
                };
                let beneficiary = self.name(beneficiary)?;
                let start = start.unwrap_or(self.dao.ctx().timestamp);
                let index = self
                    .dao
                    .create_vesting_schedule(caller, beneficiary, start, *cliff, *duration, *amount)?;
                Ok(format!("schedule {}", index))
            }
            Op::Release { beneficiary, index } => {
                let beneficiary = self.name(beneficiary)?;
                let amount = self.dao.release(beneficiary, *index)?;
                Ok(format!("released {}", amount))
            }
            Op::ProposeTimelockChange { approver, duration } => {
                let approver = self.name(approver)?;
                match self.dao.propose_timelock_duration_change(approver, *duration)? {
                    Some(applied) => Ok(format!("timelock now {}s", applied)),
                    None => Ok("approval recorded".to_string()),
                }
            }
            Op::SetApprovers { caller, approvers } => {
                let caller = match caller {
                    Some(c) => self.name(c)?,
                    None => owner,
                };
                let approvers = approvers
                    .iter()
                    .map(|a| self.name(a))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                self.dao.set_approvers(caller, approvers)?;
                Ok(format!("threshold {}", self.dao.governance().approval_threshold()))
            }
            Op::CheckBalance { account, amount } => {
                let address = self.name(account)?;
                let actual = self.dao.balance_of(&address);
                if actual != *amount {
                    anyhow::bail!("balance of {} is {}, expected {}", account, actual, amount);
                }
                Ok(format!("{} holds {}", account, actual))
            }
        }
    }

    /// Resolve a name, remembering it for display.
    fn name(&mut self, label: &str) -> anyhow::Result<Address> {
        let address = resolve(label)?;
        self.names.entry(address).or_insert_with(|| label.to_string());
        Ok(address)
    }

    /// Summary of balances for every named identity.
    pub fn balances(&self) -> Vec<(String, Amount)> {
        self.names
            .iter()
            .map(|(address, name)| (name.clone(), self.dao.balance_of(address)))
            .filter(|(_, balance)| *balance > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllocationConfig, ScheduleConfig};
    use covenant_governance::{GovernanceParams, ProposalState};
    use covenant_types::{DAY, TOKEN};

    fn genesis() -> GenesisConfig {
        let mut config = GenesisConfig::default();
        config.governance = GovernanceParams {
            proposal_threshold: 100 * TOKEN,
            voting_period: 10,
            timelock_duration: DAY,
        };
        config.allocations = vec![
            AllocationConfig { to: "alice".to_string(), amount: 1_000 * TOKEN },
            AllocationConfig { to: "bob".to_string(), amount: 50 * TOKEN },
            AllocationConfig { to: "treasury".to_string(), amount: 500 * TOKEN },
            AllocationConfig { to: "vesting".to_string(), amount: 10_000 * TOKEN },
        ];
        config.schedules = vec![ScheduleConfig {
            beneficiary: "carol".to_string(),
            start: None,
            cliff: 30 * DAY,
            duration: 180 * DAY,
            amount: 10_000 * TOKEN,
        }];
        config
    }

    #[test]
    fn test_genesis() {
        let runner = Runner::from_genesis(&genesis()).unwrap();
        let dao = runner.dao();
        assert_eq!(dao.balance_of(&Address::from_label("alice")), 1_000 * TOKEN);
        assert_eq!(dao.vesting().schedule_count(&Address::from_label("carol")), 1);
        assert_eq!(dao.ctx().number, 2);
        assert!(runner.balances().contains(&("alice".to_string(), 1_000 * TOKEN)));
    }

    #[test]
    fn test_invalid_genesis_rejected() {
        let mut config = genesis();
        // Pool holds less than the schedule needs
        config.allocations.pop();
        assert!(Runner::from_genesis(&config).is_err());
    }

    #[test]
    fn test_fund_request_scenario() {
        let mut runner = Runner::from_genesis(&genesis()).unwrap();
        let scenario = Scenario::from_toml(
            r#"
[[step]]
op = "propose-fund-request"
requester = "bob"
recipient = "bob"
amount = "200tok"
description = "grant"

[[step]]
op = "vote"
voter = "alice"
proposal = 1
support = "for"
expect_error = "Voting not started"

[[step]]
op = "advance"
blocks = 1

[[step]]
op = "vote"
voter = "alice"
proposal = 1
support = "for"

[[step]]
op = "execute-proposal"
proposal = 1
expect_error = "Voting still in progress"

[[step]]
op = "advance"
blocks = 10

[[step]]
op = "execute-proposal"
proposal = 1

[[step]]
op = "execute-proposal"
proposal = 1
expect_error = "Timelock not expired"

[[step]]
op = "advance"
blocks = 1
seconds = "1d"

[[step]]
op = "execute-proposal"
proposal = 1

[[step]]
op = "check-balance"
account = "bob"
amount = "250tok"

[[step]]
op = "execute-fund-request"
request = 1
expect_error = "already executed"
"#,
        )
        .unwrap();

        let reports = runner.run(&scenario);
        for report in &reports {
            assert!(report.passed, "step {} failed: {:?}", report.index, report.outcome);
        }
        assert_eq!(
            runner.dao().governance().state(1).unwrap(),
            ProposalState::Executed
        );
    }

    #[test]
    fn test_demo_walkthrough() {
        let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
        let config = GenesisConfig::from_file(&demos.join("genesis.toml")).unwrap();
        assert_eq!(config.governance.timelock_duration, 2 * DAY);
        let scenario = Scenario::from_file(&demos.join("scenario.toml")).unwrap();

        let mut runner = Runner::from_genesis(&config).unwrap();
        let reports = runner.run(&scenario);
        assert_eq!(reports.len(), scenario.steps.len());
        for report in &reports {
            assert!(report.passed, "step {} ({}) failed: {:?}", report.index, report.op, report.outcome);
        }
        assert_eq!(runner.dao().governance().params().timelock_duration, 3_600);
    }

    #[test]
    fn test_unmet_expectation_reported() {
        let mut runner = Runner::from_genesis(&genesis()).unwrap();
        let scenario = Scenario::from_toml(
            r#"
[[step]]
op = "release"
beneficiary = "carol"

[[step]]
op = "transfer"
from = "alice"
to = "bob"
amount = "1tok"
expect_error = true
"#,
        )
        .unwrap();

        let reports = runner.run(&scenario);
        assert!(!reports[0].passed);
        assert!(matches!(&reports[0].outcome, Outcome::Err(e) if e.contains("Cliff not reached")));
        assert!(!reports[1].passed);
        assert_eq!(reports[1].outcome, Outcome::Ok(format!("moved {}", TOKEN)));
    }

    #[test]
    fn test_report_json() {
        let report = StepReport {
            index: 0,
            op: "vote",
            block: 3,
            timestamp: 10,
            outcome: Outcome::Err("Already voted".to_string()),
            passed: true,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""status":"err""#));
        assert!(json.contains("Already voted"));
    }
}
