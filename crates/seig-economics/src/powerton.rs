// crates/seig-economics/src/powerton.rs
//
// PowerTON: a round-based lottery weighted by time-integrated stake.
//
// Each staker's "power" is the integral of their effective stake over the
// open round's window, measured in base-unit ticks (stake / 10^9 per tick) so
// realistic stakes over long windows fit in u128. Power is accrued lazily:
// whenever a staker's stake changes, the power earned at the previous stake
// since `last_update` is added before the new stake takes effect.
//
// Power never accrues past the open round's end tick. A stake change that
// arrives after the end tick (because `end_round` is late) is queued in
// `late` instead, and closing the round replays the queue against the next
// window only. However late `end_round` runs, each round's power is the
// stake integral over exactly `[start, end)`.
//
// Ending a round is split into `plan_close` (pure: closes every staker at the
// end tick, draws the winner) and `apply_close`, so the caller can pay the
// winner between the two and abort cleanly on a payout failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use seig_core::{
    amount_str, Amount, ArithmeticError, EntropySource, SeigError, StakerId, Tick, WRAPPED_PER_BASE,
};

use crate::fixed::checked_add;

/// Wrapped units per unit of lottery weight.
pub const POWER_UNIT: Amount = WRAPPED_PER_BASE;

/// Lifecycle of the lottery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotteryState {
    Uninitialized,
    Initialized,
    Running,
}

/// A stake change recorded after the open round's end tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeChange {
    pub tick: Tick,
    #[serde(with = "amount_str")]
    pub stake: Amount,
}

/// Per-staker power accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerBalance {
    /// Effective stake in force at `last_update`.
    #[serde(with = "amount_str")]
    pub stake: Amount,
    /// Power accrued inside the open round's window up to `last_update`.
    #[serde(with = "amount_str")]
    pub power: u128,
    pub last_update: Tick,
    /// Changes after the open round's end tick, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub late: Vec<StakeChange>,
}

impl PowerBalance {
    fn weight(&self) -> u128 {
        self.stake / POWER_UNIT
    }

    /// Latest notified stake, including changes queued past the round end.
    pub fn current_stake(&self) -> Amount {
        self.late.last().map(|c| c.stake).unwrap_or(self.stake)
    }

    fn accrue_to(&mut self, tick: Tick) -> Result<(), ArithmeticError> {
        if tick <= self.last_update {
            return Ok(());
        }
        let gained = self
            .weight()
            .checked_mul((tick - self.last_update) as u128)
            .ok_or(ArithmeticError::Overflow("accrue_power"))?;
        self.power = checked_add(self.power, gained, "accrue_power")?;
        self.last_update = tick;
        Ok(())
    }

    /// Apply a stake change at `now` in a window ending at `round_end`.
    fn record(&mut self, stake: Amount, now: Tick, round_end: Tick) -> Result<(), ArithmeticError> {
        if now > round_end || !self.late.is_empty() {
            self.accrue_to(round_end)?;
            match self.late.last_mut() {
                Some(last) if last.tick >= now => last.stake = stake,
                _ => self.late.push(StakeChange { tick: now, stake }),
            }
            return Ok(());
        }
        self.accrue_to(now)?;
        self.stake = stake;
        Ok(())
    }

    /// Start a new window `[start, end)`, replaying queued changes into it.
    fn roll(&mut self, start: Tick, end: Tick) -> Result<(), ArithmeticError> {
        self.power = 0;
        self.last_update = self.last_update.max(start);
        let queued = std::mem::take(&mut self.late);
        for change in queued {
            self.record(change.stake, change.tick, end)?;
        }
        Ok(())
    }

    /// Window power if the balance were closed at `end`.
    fn window_power_at(&self, end: Tick) -> Result<u128, ArithmeticError> {
        if self.last_update >= end {
            return Ok(self.power);
        }
        let inside = self
            .weight()
            .checked_mul((end - self.last_update) as u128)
            .ok_or(ArithmeticError::Overflow("close_round"))?;
        checked_add(self.power, inside, "close_round")
    }
}

/// One lottery round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryRound {
    pub index: u64,
    pub start_tick: Tick,
    pub end_tick: Tick,
    #[serde(with = "amount_str")]
    pub reward_pool: Amount,
    #[serde(with = "amount_str")]
    pub total_power: u128,
    pub winner: Option<StakerId>,
    #[serde(with = "amount_str")]
    pub payout: Amount,
    pub ended: bool,
}

impl LotteryRound {
    fn open(index: u64, start_tick: Tick, duration: Tick, reward_pool: Amount) -> Self {
        Self {
            index,
            start_tick,
            end_tick: start_tick.saturating_add(duration),
            reward_pool,
            total_power: 0,
            winner: None,
            payout: 0,
            ended: false,
        }
    }
}

/// A computed round close, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundClose {
    pub index: u64,
    pub end_tick: Tick,
    pub total_power: u128,
    pub winner: Option<StakerId>,
    /// Amount owed to the winner (the whole pool, or 0 with no winner).
    pub payout: Amount,
    /// Pool carried into the next round when there is no winner.
    pub rollover: Amount,
    /// Window power per staker at the end tick.
    pub powers: Vec<(StakerId, u128)>,
}

/// The PowerTON lottery.
///
/// Ended rounds are kept in `history`, which is persisted separately
/// (one record per round) and skipped when the lottery itself is serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardLottery {
    state: LotteryState,
    round_duration: Tick,
    current: Option<LotteryRound>,
    balances: BTreeMap<StakerId, PowerBalance>,
    #[serde(skip)]
    history: Vec<LotteryRound>,
}

impl RewardLottery {
    pub fn new(round_duration: Tick) -> Self {
        Self {
            state: LotteryState::Uninitialized,
            round_duration,
            current: None,
            balances: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> LotteryState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LotteryState::Running
    }

    pub fn round_duration(&self) -> Tick {
        self.round_duration
    }

    /// The open round, if running.
    pub fn current_round(&self) -> Option<&LotteryRound> {
        self.current.as_ref()
    }

    /// Any round by index: ended or open.
    pub fn round(&self, index: u64) -> Option<&LotteryRound> {
        self.history
            .get(index as usize)
            .or_else(|| self.current.as_ref().filter(|r| r.index == index))
    }

    pub fn ended_rounds(&self) -> &[LotteryRound] {
        &self.history
    }

    /// Reinstall ended rounds loaded from storage.
    pub fn restore_history(&mut self, mut rounds: Vec<LotteryRound>) {
        rounds.sort_by_key(|r| r.index);
        self.history = rounds;
    }

    pub fn balance(&self, staker: &StakerId) -> Option<&PowerBalance> {
        self.balances.get(staker)
    }

    pub fn balances(&self) -> impl Iterator<Item = (&StakerId, &PowerBalance)> {
        self.balances.iter()
    }

    /// Initialize once.
    pub fn init(&mut self) -> Result<(), SeigError> {
        if self.state != LotteryState::Uninitialized {
            return Err(SeigError::InvalidState(format!(
                "lottery already initialized (state {:?})",
                self.state
            )));
        }
        self.state = LotteryState::Initialized;
        info!("lottery initialized");
        Ok(())
    }

    /// Open round 0 at `now`. Resets every staker's power.
    pub fn start(&mut self, now: Tick) -> Result<(), SeigError> {
        match self.state {
            LotteryState::Initialized => {}
            LotteryState::Uninitialized => {
                return Err(SeigError::InvalidState("lottery not initialized".to_string()))
            }
            LotteryState::Running => {
                return Err(SeigError::InvalidState("lottery already running".to_string()))
            }
        }
        if self.round_duration == 0 {
            return Err(SeigError::InvalidState("round duration must be nonzero".to_string()));
        }
        for balance in self.balances.values_mut() {
            balance.stake = balance.current_stake();
            balance.late.clear();
            balance.power = 0;
            balance.last_update = now;
        }
        self.current = Some(LotteryRound::open(0, now, self.round_duration, 0));
        self.state = LotteryState::Running;
        info!(start = now, end = now + self.round_duration, "lottery started, round 0 open");
        Ok(())
    }

    /// Record a staker's new total effective stake at `now`.
    ///
    /// While running, power earned at the previous stake is accrued first.
    pub fn update_stake(&mut self, staker: StakerId, stake: Amount, now: Tick) -> Result<(), SeigError> {
        let mut balance = self.balances.get(&staker).cloned().unwrap_or_default();
        match (self.is_running(), self.current.as_ref()) {
            (true, Some(round)) => balance.record(stake, now, round.end_tick)?,
            _ => {
                balance.stake = stake;
                balance.last_update = balance.last_update.max(now);
            }
        }
        debug!(staker = %staker, stake, power = balance.power, "lottery stake updated");
        if balance.stake == 0 && balance.power == 0 && balance.late.is_empty() {
            self.balances.remove(&staker);
        } else {
            self.balances.insert(staker, balance);
        }
        Ok(())
    }

    /// Add reward to the open round's pool.
    pub fn add_to_pool(&mut self, amount: Amount) -> Result<(), SeigError> {
        let round = self
            .current
            .as_mut()
            .ok_or_else(|| SeigError::InvalidState("no open round".to_string()))?;
        round.reward_pool = checked_add(round.reward_pool, amount, "add_to_pool")?;
        Ok(())
    }

    /// Power accrued by `staker` in the open round as of `now`.
    pub fn power_of(&self, staker: &StakerId, now: Tick) -> Result<u128, SeigError> {
        let (Some(round), Some(balance)) = (self.current.as_ref(), self.balances.get(staker)) else {
            return Ok(0);
        };
        if !self.is_running() {
            return Ok(0);
        }
        Ok(balance.window_power_at(now.min(round.end_tick))?)
    }

    /// Winner of an ended round; `None` when nobody held power.
    pub fn winner_of(&self, index: u64) -> Result<Option<StakerId>, SeigError> {
        self.history
            .get(index as usize)
            .map(|r| r.winner)
            .ok_or(SeigError::RoundNotFound(index))
    }

    /// Close the open round at its end tick and draw the winner, without mutating.
    pub fn plan_close(
        &self,
        now: Tick,
        entropy: &dyn EntropySource,
        salt: &[u8],
    ) -> Result<RoundClose, SeigError> {
        if !self.is_running() {
            return Err(SeigError::InvalidState("lottery not running".to_string()));
        }
        let round = self
            .current
            .as_ref()
            .ok_or_else(|| SeigError::InvalidState("no open round".to_string()))?;
        if now < round.end_tick {
            return Err(SeigError::RoundNotFinished {
                index: round.index,
                ends_at: round.end_tick,
                now,
            });
        }

        let mut powers = Vec::with_capacity(self.balances.len());
        let mut prefix = Vec::with_capacity(self.balances.len());
        let mut total: u128 = 0;
        for (staker, balance) in &self.balances {
            let power = balance.window_power_at(round.end_tick)?;
            if power == 0 {
                continue;
            }
            total = checked_add(total, power, "close_round")?;
            powers.push((*staker, power));
            prefix.push(total);
        }

        let winner = if total == 0 {
            None
        } else {
            let seed = draw_seed(round.index, round.end_tick, total, salt);
            let ticket = entropy.draw(seed, total);
            // First staker whose cumulative power exceeds the ticket.
            let slot = prefix.partition_point(|&cumulative| cumulative <= ticket);
            powers.get(slot).map(|(staker, _)| *staker)
        };

        let (payout, rollover) = match winner {
            Some(_) => (round.reward_pool, 0),
            None => (0, round.reward_pool),
        };
        Ok(RoundClose {
            index: round.index,
            end_tick: round.end_tick,
            total_power: total,
            winner,
            payout,
            rollover,
            powers,
        })
    }

    /// Apply a close computed by `plan_close`: archive the round, open the
    /// next one at the previous end tick, and replay late stake changes into
    /// the new window.
    pub fn apply_close(&mut self, close: RoundClose) -> Result<&LotteryRound, SeigError> {
        if self.current.is_none() {
            return Err(SeigError::InvalidState("no open round".to_string()));
        }
        let next_end = close.end_tick.saturating_add(self.round_duration);
        let mut rolled = self.balances.clone();
        for balance in rolled.values_mut() {
            balance.roll(close.end_tick, next_end)?;
        }
        rolled.retain(|_, b| b.stake > 0 || b.power > 0 || !b.late.is_empty());

        let mut ended = self
            .current
            .take()
            .ok_or_else(|| SeigError::InvalidState("no open round".to_string()))?;
        ended.total_power = close.total_power;
        ended.winner = close.winner;
        ended.payout = close.payout;
        ended.ended = true;
        self.balances = rolled;

        self.current = Some(LotteryRound::open(
            close.index + 1,
            close.end_tick,
            self.round_duration,
            close.rollover,
        ));
        match close.winner {
            Some(winner) => info!(
                round = close.index,
                winner = %winner,
                payout = close.payout,
                total_power = close.total_power,
                "lottery round ended"
            ),
            None => info!(
                round = close.index,
                rollover = close.rollover,
                "lottery round ended with no power, pool rolls over"
            ),
        }
        self.history.push(ended);
        let index = self.history.len() - 1;
        Ok(&self.history[index])
    }
}

/// Seed for a round's draw: the first 8 bytes of
/// `sha256(index || end_tick || total_power || salt)`, big-endian.
pub fn draw_seed(index: u64, end_tick: Tick, total_power: u128, salt: &[u8]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(index.to_be_bytes());
    hasher.update(end_tick.to_be_bytes());
    hasher.update(total_power.to_be_bytes());
    hasher.update(salt);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
