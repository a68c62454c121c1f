//! DAO runtime.
//!
//! Composes the token ledger, transfer guard, vesting engine, governance
//! engine and treasury, and owns the block clock. Every mutating operation
//! runs inside [`Dao::transact`], so a rejected call has no effect. Token
//! writes are journaled and undone on failure. The other components check
//! before they mutate, except that a failing proposal can leave fund requests
//! paid by its earlier actions; those operations also restore the treasury.

use covenant_ledger::{
    CheckpointedToken, GuardedToken, PrivilegedRole, TokenLedger, TransferGuard, VestingLedger,
};
use covenant_types::{Address, Amount, BlockContext, BlockNumber, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::action::{Action, Call};
use crate::config::GovernanceParams;
use crate::engine::{ActionExecutor, ApprovalOracle, GovernanceEngine};
use crate::error::GovernanceError;
use crate::proposal::{ProposalId, ProposalState};
use crate::treasury::{RequestId, Treasury};
use crate::voting::VoteSupport;

/// Well-known identities of a DAO deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoIdentities {
    /// Administers the guard, the vesting engine and the approver set
    pub owner: Address,
    pub governance: Address,
    pub treasury: Address,
    pub vesting_pool: Address,
    pub staking_sink: Option<Address>,
}

/// Everything a transaction may mutate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaoState {
    pub token: CheckpointedToken,
    pub guard: TransferGuard,
    pub vesting: VestingLedger,
    pub governance: GovernanceEngine,
    pub treasury: Treasury,
}

/// Components an operation can leave partly written when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footprint {
    /// Token balances and checkpoints
    Ledger,
    /// Token state plus treasury payout marks
    LedgerAndTreasury,
}

/// Runtime with all-or-nothing operations.
#[derive(Debug, Clone)]
pub struct Dao {
    ctx: BlockContext,
    identities: DaoIdentities,
    state: DaoState,
}

impl Dao {
    /// Build a DAO at `genesis`.
    pub fn new(
        identities: DaoIdentities,
        params: GovernanceParams,
        approvers: Vec<Address>,
        symbol: impl Into<String>,
        genesis: BlockContext,
    ) -> Result<Self, GovernanceError> {
        let mut guard = TransferGuard::new(identities.owner)
            .with_exempt(identities.vesting_pool, PrivilegedRole::VestingPool)
            .with_exempt(identities.treasury, PrivilegedRole::Treasury)
            .with_exempt(identities.governance, PrivilegedRole::Governance);
        if let Some(sink) = identities.staking_sink {
            guard = guard.with_exempt(sink, PrivilegedRole::StakingSink);
        }

        let mut token = CheckpointedToken::new(symbol);
        token.advance_to(genesis.number)?;

        let state = DaoState {
            token,
            guard,
            vesting: VestingLedger::new(identities.vesting_pool, identities.owner),
            governance: GovernanceEngine::new(identities.governance, identities.owner, params, approvers)?,
            treasury: Treasury::new(identities.treasury),
        };

        info!(
            governance = %identities.governance,
            treasury = %identities.treasury,
            vesting_pool = %identities.vesting_pool,
            block = genesis.number,
            timestamp = genesis.timestamp,
            "dao initialized"
        );

        Ok(Self {
            ctx: genesis,
            identities,
            state,
        })
    }

    /// Run `f` against the state, undoing its writes within `footprint` if
    /// it fails.
    pub fn transact<T, F>(&mut self, op: &'static str, footprint: Footprint, f: F) -> Result<T, GovernanceError>
    where
        F: FnOnce(&mut DaoState, BlockContext) -> Result<T, GovernanceError>,
    {
        let treasury = match footprint {
            Footprint::Ledger => None,
            Footprint::LedgerAndTreasury => Some(self.state.treasury.clone()),
        };
        self.state.token.begin_journal();

        match f(&mut self.state, self.ctx) {
            Ok(value) => {
                self.state.token.commit_journal();
                Ok(value)
            }
            Err(e) => {
                self.state.token.rollback_journal();
                if let Some(treasury) = treasury {
                    self.state.treasury = treasury;
                }
                warn!(op, block = self.ctx.number, error = %e, "operation rejected, state restored");
                Err(e)
            }
        }
    }

    /// Move the clock forward.
    pub fn advance(&mut self, blocks: BlockNumber, seconds: Timestamp) -> Result<BlockContext, GovernanceError> {
        let mut next = self.ctx;
        next.advance(blocks, seconds);
        self.state.token.advance_to(next.number)?;
        self.ctx = next;
        debug!(block = next.number, timestamp = next.timestamp, "clock advanced");
        Ok(next)
    }

    /// Create new tokens. Owner only.
    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), GovernanceError> {
        let owner = self.identities.owner;
        self.transact("mint", Footprint::Ledger, |s, _| {
            if caller != owner {
                return Err(GovernanceError::Unauthorized("only the owner may mint".to_string()));
            }
            s.token.mint(to, amount)?;
            Ok(())
        })
    }

    /// Guarded token transfer from `caller`.
    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), GovernanceError> {
        self.transact("transfer", Footprint::Ledger, |s, ctx| {
            let DaoState { token, guard, vesting, .. } = s;
            let mut guarded = GuardedToken::new(token, &*guard, &*vesting, ctx.timestamp);
            guarded.transfer(caller, to, amount)?;
            Ok(())
        })
    }

    /// Register an extra identity that bypasses the transfer guard.
    pub fn set_exempt(&mut self, caller: Address, account: Address, role: PrivilegedRole) -> Result<(), GovernanceError> {
        self.transact("set_exempt", Footprint::Ledger, |s, _| {
            Ok(s.guard.set_exempt(caller, account, role)?)
        })
    }

    pub fn create_proposal(
        &mut self,
        caller: Address,
        description: impl Into<String>,
        targets: Vec<Address>,
        values: Vec<Amount>,
        calls: Vec<Call>,
    ) -> Result<ProposalId, GovernanceError> {
        let description = description.into();
        self.transact("create_proposal", Footprint::Ledger, |s, ctx| {
            s.governance
                .create_proposal(caller, description, targets, values, calls, ctx, &s.token)
        })
    }

    pub fn vote(&mut self, caller: Address, proposal_id: ProposalId, support: VoteSupport) -> Result<Amount, GovernanceError> {
        self.transact("vote", Footprint::Ledger, |s, ctx| {
            s.governance.vote(caller, proposal_id, support, ctx, &s.token)
        })
    }

    /// Advance a proposal one step. Anyone may call.
    pub fn execute_proposal(&mut self, caller: Address, proposal_id: ProposalId) -> Result<ProposalState, GovernanceError> {
        self.transact("execute_proposal", Footprint::LedgerAndTreasury, |s, ctx| {
            let DaoState { token, guard, vesting, governance, treasury } = s;
            let mut executor = DaoExecutor {
                token,
                guard: &*guard,
                vesting: &*vesting,
                treasury,
                governance: governance.address(),
                now: ctx.timestamp,
            };
            let state = governance.execute_proposal(proposal_id, ctx, &mut executor)?;
            debug!(proposal = proposal_id, caller = %caller, ?state, "execute_proposal");
            Ok(state)
        })
    }

    /// Open a fund request. Returns the backing proposal id.
    pub fn propose_fund_request(
        &mut self,
        caller: Address,
        amount: Amount,
        recipient: Address,
        description: impl Into<String>,
    ) -> Result<ProposalId, GovernanceError> {
        let description = description.into();
        self.transact("propose_fund_request", Footprint::Ledger, |s, ctx| {
            s.treasury.create_fund_request(
                caller,
                amount,
                recipient,
                description,
                ctx,
                &mut s.governance,
                &s.token,
            )
        })
    }

    /// Pay out a fund request whose proposal is approved.
    ///
    /// A queued proposal already counts as approved, so this can pay before
    /// the timelock expires. The proposal then stays Queued: its own action
    /// fails with `RequestAlreadyExecuted` on every attempt.
    pub fn execute_fund_request(&mut self, caller: Address, request_id: RequestId) -> Result<Amount, GovernanceError> {
        self.transact("execute_fund_request", Footprint::Ledger, |s, ctx| {
            let DaoState { token, guard, vesting, governance, treasury } = s;
            let mut guarded = GuardedToken::new(token, &*guard, &*vesting, ctx.timestamp);
            let paid = treasury.execute_fund_request(request_id, &*governance, &mut guarded)?;
            debug!(request = request_id, caller = %caller, paid, "execute_fund_request");
            Ok(paid)
        })
    }

    /// Create a vesting schedule. Vesting owner only.
    pub fn create_vesting_schedule(
        &mut self,
        caller: Address,
        beneficiary: Address,
        start: Timestamp,
        cliff_duration: Timestamp,
        duration: Timestamp,
        total_amount: Amount,
    ) -> Result<usize, GovernanceError> {
        self.transact("create_vesting_schedule", Footprint::Ledger, |s, _| {
            Ok(s.vesting.create_schedule(
                caller,
                beneficiary,
                start,
                cliff_duration,
                duration,
                total_amount,
                &s.token,
            )?)
        })
    }

    /// Release the caller's vested tokens on schedule `index`.
    pub fn release(&mut self, caller: Address, index: usize) -> Result<Amount, GovernanceError> {
        self.transact("release", Footprint::Ledger, |s, ctx| {
            Ok(s.vesting.release(caller, index, ctx.timestamp, &mut s.token, &s.guard)?)
        })
    }

    pub fn propose_timelock_duration_change(
        &mut self,
        caller: Address,
        duration: Timestamp,
    ) -> Result<Option<Timestamp>, GovernanceError> {
        self.transact("propose_timelock_duration_change", Footprint::Ledger, |s, _| {
            s.governance.propose_timelock_duration_change(caller, duration)
        })
    }

    pub fn set_approvers(&mut self, caller: Address, approvers: Vec<Address>) -> Result<(), GovernanceError> {
        self.transact("set_approvers", Footprint::Ledger, |s, _| {
            s.governance.set_approvers(caller, approvers)
        })
    }

    pub fn ctx(&self) -> BlockContext {
        self.ctx
    }

    pub fn identities(&self) -> &DaoIdentities {
        &self.identities
    }

    pub fn state(&self) -> &DaoState {
        &self.state
    }

    pub fn governance(&self) -> &GovernanceEngine {
        &self.state.governance
    }

    pub fn treasury(&self) -> &Treasury {
        &self.state.treasury
    }

    pub fn vesting(&self) -> &VestingLedger {
        &self.state.vesting
    }

    pub fn token(&self) -> &CheckpointedToken {
        &self.state.token
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.token.balance_of(account)
    }

    /// Unvested allocation of `account` at the current time.
    pub fn locked_balance(&self, account: &Address) -> Amount {
        self.state.vesting.locked_balance(account, self.ctx.timestamp)
    }

    /// Vested but unreleased allocation of `account` at the current time.
    pub fn vested_balance(&self, account: &Address) -> Amount {
        self.state.vesting.vested_balance(account, self.ctx.timestamp)
    }
}

/// Routes proposal actions to the components they target.
struct DaoExecutor<'a> {
    token: &'a mut CheckpointedToken,
    guard: &'a TransferGuard,
    vesting: &'a VestingLedger,
    treasury: &'a mut Treasury,
    /// Source of action values
    governance: Address,
    now: Timestamp,
}

impl ActionExecutor for DaoExecutor<'_> {
    fn execute(&mut self, action: &Action, oracle: &dyn ApprovalOracle) -> Result<(), GovernanceError> {
        let mut guarded = GuardedToken::new(&mut *self.token, self.guard, self.vesting, self.now);

        if action.value > 0 {
            guarded
                .transfer(self.governance, action.target, action.value)
                .map_err(|e| GovernanceError::TransferFailed(e.to_string()))?;
        }

        match action.call {
            Call::Transfer => Ok(()),
            Call::ExecuteFundRequest { request_id } => {
                if action.target != self.treasury.address() {
                    return Err(GovernanceError::NotExecutable(format!(
                        "fund request {} routed to {} instead of the treasury",
                        request_id, action.target
                    )));
                }
                self.treasury.execute_fund_request(request_id, oracle, &mut guarded)?;
                Ok(())
            }
            Call::SetProposalThreshold { .. } | Call::SetVotingPeriod { .. } => {
                Err(GovernanceError::InvalidParameter(format!(
                    "parameter change sent to {} instead of the governance engine",
                    action.target
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_types::TOKEN;

    fn identities() -> DaoIdentities {
        DaoIdentities {
            owner: Address::from_label("owner"),
            governance: Address::from_label("governance"),
            treasury: Address::from_label("treasury"),
            vesting_pool: Address::from_label("vesting"),
            staking_sink: None,
        }
    }

    fn dao() -> Dao {
        let ids = identities();
        let approvers = vec![Address::from_label("a1")];
        Dao::new(ids, GovernanceParams::default(), approvers, "COV", BlockContext::new(1, 1_000)).unwrap()
    }

    #[test]
    fn test_failed_operation_restores_state() {
        let mut dao = dao();
        let owner = dao.identities().owner;
        let alice = Address::from_label("alice");
        dao.mint(owner, alice, 10 * TOKEN).unwrap();

        let checkpoints = dao.token().checkpoint_count(&alice);
        assert!(dao.transfer(alice, Address::from_label("bob"), 11 * TOKEN).is_err());
        assert_eq!(dao.balance_of(&alice), 10 * TOKEN);
        assert_eq!(dao.token().checkpoint_count(&alice), checkpoints);
    }

    #[test]
    fn test_mint_owner_only() {
        let mut dao = dao();
        let alice = Address::from_label("alice");
        assert!(matches!(
            dao.mint(alice, alice, 1),
            Err(GovernanceError::Unauthorized(_))
        ));
        assert_eq!(dao.token().total_supply(), 0);
    }

    #[test]
    fn test_advance_moves_token_clock() {
        let mut dao = dao();
        let ctx = dao.advance(10, 120).unwrap();
        assert_eq!(ctx, BlockContext::new(11, 1_120));
        assert_eq!(dao.token().current_block(), 11);
    }
}
