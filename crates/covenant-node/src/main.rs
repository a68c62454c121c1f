//! Covenant Node - DAO scenario runner.
//!
//! Loads a genesis file, builds the DAO it describes and replays a
//! scenario script against it, reporting the outcome of every step.

pub mod config;
pub mod runner;
pub mod scenario;
pub mod telemetry;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "covenant-node")]
#[command(about = "Covenant Node - governed treasury and vesting runtime")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Log level (overrides the genesis logging section)
    #[arg(short, long, global = true, env = "COVENANT_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scenario against a fresh DAO
    Run {
        /// Genesis config file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Scenario script
        #[arg(short, long, value_name = "FILE")]
        script: PathBuf,

        /// Print step reports as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Validate a genesis config and apply it
    Check {
        /// Genesis config file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },
    /// Write a default genesis config
    Init {
        /// Output path
        #[arg(short, long, default_value = "genesis.toml")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Run { config, script, json } => {
            let genesis = config::GenesisConfig::from_file(&config)?;
            telemetry::init_from_config(&genesis.logging, args.log_level.as_deref())?;
            info!("Loading configuration from: {:?}", config);

            let scenario = scenario::Scenario::from_file(&script)?;
            let mut runner = runner::Runner::from_genesis(&genesis)?;
            info!(name = %genesis.name, steps = scenario.steps.len(), "running scenario");

            let mut failed = 0;
            for (index, step) in scenario.steps.iter().enumerate() {
                let report = runner.run_step(index, step);
                if !report.passed {
                    failed += 1;
                }
                if json {
                    println!("{}", serde_json::to_string(&report)?);
                } else {
                    print_report(&report);
                }
            }

            if !json {
                println!();
                for (name, balance) in runner.balances() {
                    println!("  {:<24} {}", name, balance);
                }
            }

            if failed > 0 {
                error!(failed, "scenario finished with unmet expectations");
                anyhow::bail!("{} of {} steps did not match expectations", failed, scenario.steps.len());
            }
            info!("scenario complete");
        }
        Command::Check { config } => {
            let genesis = config::GenesisConfig::from_file(&config)?;
            telemetry::init_from_config(&genesis.logging, args.log_level.as_deref())?;

            let runner = runner::Runner::from_genesis(&genesis)?;
            let dao = runner.dao();
            println!("{} is valid", config.display());
            println!("  supply:     {}", dao.token().total_supply());
            println!("  approvers:  {}", dao.governance().approvers().len());
            println!("  threshold:  {}", dao.governance().params().proposal_threshold);
        }
        Command::Init { out } => {
            if out.exists() {
                anyhow::bail!("Refusing to overwrite '{}'", out.display());
            }
            config::GenesisConfig::default().to_file(&out)?;
            println!("Wrote default genesis to {}", out.display());
        }
    }

    Ok(())
}

fn print_report(report: &runner::StepReport) {
    let mark = if report.passed { "ok " } else { "ERR" };
    let detail = match &report.outcome {
        runner::Outcome::Ok(detail) => detail.clone(),
        runner::Outcome::Err(e) => format!("rejected: {}", e),
    };
    println!(
        "[{}] #{:<3} {:<24} block {:<6} {}",
        mark, report.index, report.op, report.block, detail
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args() {
        let args = Args::parse_from([
            "covenant-node",
            "run",
            "--config", "genesis.toml",
            "--script", "scenario.toml",
            "--json",
        ]);

        match args.command {
            Command::Run { config, script, json } => {
                assert_eq!(config, PathBuf::from("genesis.toml"));
                assert_eq!(script, PathBuf::from("scenario.toml"));
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_check_args() {
        let args = Args::parse_from(["covenant-node", "--log-level", "debug", "check", "-c", "g.toml"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(matches!(args.command, Command::Check { .. }));
    }
}
