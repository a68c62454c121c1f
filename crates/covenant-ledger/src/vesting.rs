//! Token vesting engine.
//!
//! Each beneficiary owns an ordered list of schedules. A schedule vests
//! nothing before its cliff, then linearly from `start` until
//! `start + duration`, when the full amount is vested.
//!
//! Schedules draw on one pooled balance held by the engine's own address.
//! Creation checks the pool's instantaneous balance against the new
//! schedule only, not against amounts already committed to other schedules;
//! `total_committed` lets operators size the pool.

use std::collections::BTreeMap;
use covenant_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::error::LedgerError;
use crate::guard::{GuardedToken, TransferGuard};
use crate::interfaces::{LockedBalanceSource, TokenLedger};

/// One linear vesting schedule with a cliff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
    /// Recipient of vested tokens
    pub beneficiary: Address,
    /// Vesting start
    pub start: Timestamp,
    /// `start + cliff_duration`
    pub cliff: Timestamp,
    /// Seconds from start to full vesting
    pub duration: Timestamp,
    /// Total allocation
    pub total_amount: Amount,
    /// Already paid out
    pub released: Amount,
}

impl VestingSchedule {
    /// Validate parameters and build a fresh schedule.
    pub fn new(
        beneficiary: Address,
        start: Timestamp,
        cliff_duration: Timestamp,
        duration: Timestamp,
        total_amount: Amount,
    ) -> Result<Self, LedgerError> {
        if beneficiary.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        if duration == 0 {
            return Err(LedgerError::InvalidSchedule("duration must be positive".to_string()));
        }
        if total_amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if cliff_duration > duration {
            return Err(LedgerError::InvalidSchedule(format!(
                "cliff {} exceeds duration {}",
                cliff_duration, duration
            )));
        }
        // cliff <= end, so checking end covers both
        start
            .checked_add(duration)
            .ok_or_else(|| LedgerError::InvalidSchedule("end time overflows".to_string()))?;

        Ok(Self {
            beneficiary,
            start,
            cliff: start + cliff_duration,
            duration,
            total_amount,
            released: 0,
        })
    }

    /// Time at which the whole allocation is vested.
    pub fn end(&self) -> Timestamp {
        self.start + self.duration
    }

    /// Amount vested at `now`.
    ///
    /// `total * (now - start) / duration`, floored, between cliff and end.
    pub fn vested_amount(&self, now: Timestamp) -> Amount {
        if now < self.cliff {
            return 0;
        }
        if now >= self.end() {
            return self.total_amount;
        }

        // floor((q*d + r) * e / d) == q*e + floor(r*e / d); neither term overflows
        let elapsed = (now - self.start) as Amount;
        let duration = self.duration as Amount;
        let q = self.total_amount / duration;
        let r = self.total_amount % duration;
        q * elapsed + r * elapsed / duration
    }

    /// Vested but not yet released.
    pub fn releasable(&self, now: Timestamp) -> Amount {
        self.vested_amount(now).saturating_sub(self.released)
    }

    /// Not yet vested.
    pub fn unvested(&self, now: Timestamp) -> Amount {
        self.total_amount - self.vested_amount(now)
    }
}

/// Schedule registry and release logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VestingLedger {
    /// Pool address; holds the tokens all schedules draw on
    address: Address,
    /// Identity allowed to create schedules
    owner: Address,
    /// Beneficiary -> schedules in insertion order
    schedules: BTreeMap<Address, Vec<VestingSchedule>>,
}

impl VestingLedger {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            schedules: BTreeMap::new(),
        }
    }

    /// Pool address.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Create a schedule for `beneficiary`. Returns its index.
    #[allow(clippy::too_many_arguments)]
    pub fn create_schedule(
        &mut self,
        caller: Address,
        beneficiary: Address,
        start: Timestamp,
        cliff_duration: Timestamp,
        duration: Timestamp,
        total_amount: Amount,
        token: &dyn TokenLedger,
    ) -> Result<usize, LedgerError> {
        if caller != self.owner {
            return Err(LedgerError::Unauthorized("only the vesting owner may create schedules".to_string()));
        }

        let schedule = VestingSchedule::new(beneficiary, start, cliff_duration, duration, total_amount)?;

        let pool = token.balance_of(&self.address);
        if pool < total_amount {
            return Err(LedgerError::InsufficientPoolBalance {
                required: total_amount,
                available: pool,
            });
        }

        let list = self.schedules.entry(beneficiary).or_default();
        list.push(schedule);
        let index = list.len() - 1;

        info!(
            beneficiary = %beneficiary,
            index,
            start,
            cliff_duration,
            duration,
            total_amount,
            "vesting schedule created"
        );
        Ok(index)
    }

    /// Release everything vested on the caller's schedule `index`.
    ///
    /// `released` is committed before the outbound transfer; a failed
    /// transfer restores it.
    pub fn release(
        &mut self,
        caller: Address,
        index: usize,
        now: Timestamp,
        token: &mut dyn TokenLedger,
        guard: &TransferGuard,
    ) -> Result<Amount, LedgerError> {
        let pool_address = self.address;
        let schedule = self.schedule_mut(&caller, index)?;

        if now < schedule.cliff {
            return Err(LedgerError::CliffNotReached {
                cliff: schedule.cliff,
                now,
            });
        }

        let unreleased = schedule.releasable(now);
        if unreleased == 0 {
            return Err(LedgerError::NothingToRelease);
        }

        let pool = token.balance_of(&pool_address);
        if pool < unreleased {
            return Err(LedgerError::InsufficientPoolBalance {
                required: unreleased,
                available: pool,
            });
        }

        schedule.released += unreleased;

        let result = {
            let mut guarded = GuardedToken::new(token, guard, &*self, now);
            guarded.transfer(pool_address, caller, unreleased)
        };

        if let Err(e) = result {
            let schedule = self.schedule_mut(&caller, index)?;
            schedule.released -= unreleased;
            debug!(beneficiary = %caller, index, error = %e, "release transfer failed, rolled back");
            return Err(LedgerError::TransferFailed(e.to_string()));
        }

        info!(beneficiary = %caller, index, amount = unreleased, "vested tokens released");
        Ok(unreleased)
    }

    /// Claimable now across all of `beneficiary`'s schedules.
    pub fn vested_balance(&self, beneficiary: &Address, now: Timestamp) -> Amount {
        self.schedules_of(beneficiary)
            .iter()
            .map(|s| s.releasable(now))
            .sum()
    }

    /// Still unvested across all of `beneficiary`'s schedules.
    pub fn locked_balance(&self, beneficiary: &Address, now: Timestamp) -> Amount {
        self.schedules_of(beneficiary)
            .iter()
            .map(|s| s.unvested(now))
            .sum()
    }

    /// Total paid out to `beneficiary`.
    pub fn released_total(&self, beneficiary: &Address) -> Amount {
        self.schedules_of(beneficiary).iter().map(|s| s.released).sum()
    }

    /// Total ever allocated to `beneficiary`.
    pub fn allocated_total(&self, beneficiary: &Address) -> Amount {
        self.schedules_of(beneficiary).iter().map(|s| s.total_amount).sum()
    }

    /// Outstanding obligations (allocated minus released) over every schedule.
    pub fn total_committed(&self) -> Amount {
        self.schedules
            .values()
            .flatten()
            .map(|s| s.total_amount - s.released)
            .sum()
    }

    /// `beneficiary`'s schedules in insertion order.
    pub fn schedules_of(&self, beneficiary: &Address) -> &[VestingSchedule] {
        self.schedules
            .get(beneficiary)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn schedule(&self, beneficiary: &Address, index: usize) -> Result<&VestingSchedule, LedgerError> {
        self.schedules_of(beneficiary)
            .get(index)
            .ok_or(LedgerError::ScheduleNotFound {
                beneficiary: *beneficiary,
                index,
            })
    }

    pub fn schedule_count(&self, beneficiary: &Address) -> usize {
        self.schedules_of(beneficiary).len()
    }

    /// Releasable amount on one schedule.
    pub fn releasable(&self, beneficiary: &Address, index: usize, now: Timestamp) -> Result<Amount, LedgerError> {
        Ok(self.schedule(beneficiary, index)?.releasable(now))
    }

    fn schedule_mut(&mut self, beneficiary: &Address, index: usize) -> Result<&mut VestingSchedule, LedgerError> {
        self.schedules
            .get_mut(beneficiary)
            .and_then(|list| list.get_mut(index))
            .ok_or(LedgerError::ScheduleNotFound {
                beneficiary: *beneficiary,
                index,
            })
    }
}

impl LockedBalanceSource for VestingLedger {
    fn locked_balance(&self, account: &Address, now: Timestamp) -> Amount {
        VestingLedger::locked_balance(self, account, now)
    }
}
