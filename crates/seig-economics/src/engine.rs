// crates/seig-economics/src/engine.rs
//
// StakingEngine: the seig manager composing chain ledgers, the aggregate
// ledger, the minter, the withdrawal queues, and the PowerTON lottery.
//
// Every public operation reads the current tick from the clock once and
// passes it down to catch-up, the lottery, and the request queues.
// Mutating operations take `&mut self`, and those that change effective
// balances or pay out custody funds catch the minter up first. Read
// operations take `&self` and project pending seigniorage without writing
// it.
//
// Asset movements and ledger writes are ordered so that a failure leaves
// no partial state:
//   - catch-up plans the distribution, mints the backing asset, then
//     applies factors;
//   - deposit credits the ledger, pulls the asset, and on a failed pull
//     removes exactly the principal it credited;
//   - payouts move the asset before request or round state changes.
//
// A catch-up performed before a later validation failure stays applied.
// It only realises seigniorage that had already accrued.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use seig_core::{
    amount_str, Address, Amount, Asset, AssetService, ChainId, Clock, EntropySource, SeigError,
    StakerId, Tick, WRAPPED_ONE,
};

use crate::deposit::{RequestQueue, WithdrawalRequest};
use crate::fixed::{checked_add, to_effective};
use crate::minter::{MintReport, SeigniorageMinter};
use crate::powerton::{LotteryRound, LotteryState, RewardLottery};
use crate::tot::{self, AggregateLedger, ChainLedger};

/// Economic parameters of an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wrapped units minted per elapsed tick.
    #[serde(with = "amount_str")]
    pub per_tick_rate: Amount,
    /// Ticks a withdrawal request waits before it can be processed.
    pub withdrawal_delay: Tick,
    /// Length of a lottery round in ticks.
    pub round_duration: Tick,
    /// Share of each mint routed to the open lottery round, in basis points.
    pub power_share_bps: u32,
    /// Mixed into every lottery draw seed.
    pub entropy_salt: String,
    /// Account holding all staked value.
    pub custody: Address,
    /// Account holding lottery reward pools.
    pub lottery_account: Address,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            per_tick_rate: WRAPPED_ONE,
            withdrawal_delay: 10,
            round_duration: 100,
            power_share_bps: 0,
            entropy_salt: "seig".to_string(),
            custody: Address::from_label("seig/custody"),
            lottery_account: Address::from_label("seig/powerton"),
        }
    }
}

/// Registration record of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub id: ChainId,
    pub registered_at: Tick,
    pub last_commit_tick: Option<Tick>,
    pub commit_count: u64,
}

/// Read view of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub id: ChainId,
    pub registered_at: Tick,
    pub last_commit_tick: Option<Tick>,
    pub commit_count: u64,
    #[serde(with = "amount_str")]
    pub total_stake: Amount,
    #[serde(with = "amount_str")]
    pub factor: u128,
    pub stakers: usize,
}

/// Outcome of `process_request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Requests processed in this call.
    pub processed: usize,
    /// Effective value withdrawn, in wrapped units.
    #[serde(with = "amount_str")]
    pub amount: Amount,
    /// Currency the staker received.
    pub payout_asset: Asset,
    /// Amount received in `payout_asset` units.
    #[serde(with = "amount_str")]
    pub payout_amount: u128,
}

/// Outcome of `redeposit_multi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedepositSummary {
    pub redeposited: usize,
    #[serde(with = "amount_str")]
    pub amount: Amount,
}

/// Engine-wide status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub now: Tick,
    pub last_mint_tick: Tick,
    #[serde(with = "amount_str")]
    pub per_tick_rate: Amount,
    pub chains: usize,
    #[serde(with = "amount_str")]
    pub total_staked: Amount,
    pub lottery_state: LotteryState,
    pub current_round: Option<u64>,
}

/// Owned copy of all engine state other than collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub minter: SeigniorageMinter,
    pub chains: BTreeMap<ChainId, ChainRecord>,
    pub ledgers: BTreeMap<ChainId, ChainLedger>,
    pub tot: AggregateLedger,
    pub requests: BTreeMap<(ChainId, StakerId), RequestQueue>,
    /// Includes ended rounds.
    pub lottery: RewardLottery,
}

/// The seigniorage staking engine.
pub struct StakingEngine<A: AssetService> {
    config: EngineConfig,
    minter: SeigniorageMinter,
    chains: BTreeMap<ChainId, ChainRecord>,
    ledgers: BTreeMap<ChainId, ChainLedger>,
    tot: AggregateLedger,
    requests: BTreeMap<(ChainId, StakerId), RequestQueue>,
    lottery: RewardLottery,
    asset: A,
    entropy: Arc<dyn EntropySource>,
    clock: Arc<dyn Clock>,
}

impl<A: AssetService> StakingEngine<A> {
    /// Create an empty engine. Minting starts at the clock's current tick.
    pub fn new(
        config: EngineConfig,
        asset: A,
        entropy: Arc<dyn EntropySource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let start = clock.current_tick();
        Self {
            minter: SeigniorageMinter::new(config.per_tick_rate, start),
            lottery: RewardLottery::new(config.round_duration),
            config,
            chains: BTreeMap::new(),
            ledgers: BTreeMap::new(),
            tot: AggregateLedger::new(),
            requests: BTreeMap::new(),
            asset,
            entropy,
            clock,
        }
    }

    /// Rebuild an engine from persisted state.
    ///
    /// A configured rate that differs from the persisted one takes effect
    /// from the last mint tick.
    pub fn from_snapshot(
        config: EngineConfig,
        snapshot: EngineSnapshot,
        asset: A,
        entropy: Arc<dyn EntropySource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut minter = snapshot.minter;
        if minter.per_tick_rate() != config.per_tick_rate {
            warn!(
                persisted = minter.per_tick_rate(),
                configured = config.per_tick_rate,
                "per-tick rate changed since last snapshot"
            );
            minter.set_per_tick_rate(config.per_tick_rate);
        }
        Self {
            config,
            minter,
            chains: snapshot.chains,
            ledgers: snapshot.ledgers,
            tot: snapshot.tot,
            requests: snapshot.requests,
            lottery: snapshot.lottery,
            asset,
            entropy,
            clock,
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            minter: self.minter.clone(),
            chains: self.chains.clone(),
            ledgers: self.ledgers.clone(),
            tot: self.tot.clone(),
            requests: self.requests.clone(),
            lottery: self.lottery.clone(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn asset(&self) -> &A {
        &self.asset
    }

    pub fn asset_mut(&mut self) -> &mut A {
        &mut self.asset
    }

    pub fn minter(&self) -> &SeigniorageMinter {
        &self.minter
    }

    pub fn tot(&self) -> &AggregateLedger {
        &self.tot
    }

    pub fn ledger(&self, chain: &ChainId) -> Option<&ChainLedger> {
        self.ledgers.get(chain)
    }

    pub fn lottery(&self) -> &RewardLottery {
        &self.lottery
    }

    pub fn now(&self) -> Tick {
        self.clock.current_tick()
    }

    fn ensure_chain(&self, chain: &ChainId) -> Result<(), SeigError> {
        if self.chains.contains_key(chain) {
            Ok(())
        } else {
            Err(SeigError::UnknownChain(*chain))
        }
    }

    fn lottery_bps(&self) -> u32 {
        if self.lottery.is_running() {
            self.config.power_share_bps
        } else {
            0
        }
    }

    // ---------------------------------------------------------------
    // Minting
    // ---------------------------------------------------------------

    /// Mint and distribute seigniorage for the ticks since the last mint.
    pub fn catch_up(&mut self) -> Result<MintReport, SeigError> {
        let now = self.now();
        self.catch_up_at(now)
    }

    fn catch_up_at(&mut self, now: Tick) -> Result<MintReport, SeigError> {
        let bps = self.lottery_bps();
        let Some(plan) = self.minter.plan(now, &self.tot, &self.ledgers, bps)? else {
            return Ok(MintReport::idle(0));
        };

        let slice = plan.lottery_slice;
        let backing = checked_add(plan.distributed(), slice, "catch_up")?;
        if backing > 0 {
            let custody = self.config.custody;
            self.asset.mint(Asset::Wrapped, &custody, backing)?;
            if slice > 0 {
                self.asset
                    .transfer(Asset::Wrapped, &custody, &self.config.lottery_account, slice)?;
            }
        }

        let report = self.minter.apply(plan, &mut self.tot, &mut self.ledgers)?;
        if slice > 0 {
            self.lottery.add_to_pool(slice)?;
        }
        Ok(report)
    }

    /// Factors every chain would have after a catch-up at `now`.
    fn projected_factors(&self, now: Tick) -> Result<BTreeMap<ChainId, u128>, SeigError> {
        let mut factors: BTreeMap<ChainId, u128> = self
            .ledgers
            .iter()
            .map(|(chain, ledger)| (*chain, ledger.factor()))
            .collect();
        if let Some(plan) = self
            .minter
            .plan(now, &self.tot, &self.ledgers, self.lottery_bps())?
        {
            for share in plan.shares {
                factors.insert(share.chain, share.factor);
            }
        }
        Ok(factors)
    }

    // ---------------------------------------------------------------
    // Chain registry
    // ---------------------------------------------------------------

    /// Register a chain and create its ledger.
    pub fn register_chain(&mut self, chain: ChainId) -> Result<ChainRecord, SeigError> {
        if self.chains.contains_key(&chain) {
            return Err(SeigError::AlreadyRegistered(chain));
        }
        let record = ChainRecord {
            id: chain,
            registered_at: self.now(),
            last_commit_tick: None,
            commit_count: 0,
        };
        self.chains.insert(chain, record.clone());
        self.ledgers.insert(chain, ChainLedger::new());
        info!(chain = %chain, tick = record.registered_at, "chain registered");
        Ok(record)
    }

    /// Record a commit from a chain's operator.
    pub fn commit(&mut self, chain: ChainId) -> Result<MintReport, SeigError> {
        self.ensure_chain(&chain)?;
        let now = self.now();
        let report = self.catch_up_at(now)?;
        if let Some(record) = self.chains.get_mut(&chain) {
            record.last_commit_tick = Some(now);
            record.commit_count += 1;
            debug!(chain = %chain, tick = now, count = record.commit_count, "commit recorded");
        }
        Ok(report)
    }

    pub fn chain_info(&self, chain: &ChainId) -> Result<ChainInfo, SeigError> {
        let record = self
            .chains
            .get(chain)
            .ok_or(SeigError::UnknownChain(*chain))?;
        let factors = self.projected_factors(self.now())?;
        self.chain_view(record, &factors)
    }

    /// All registered chains in id order.
    pub fn chains(&self) -> Result<Vec<ChainInfo>, SeigError> {
        let factors = self.projected_factors(self.now())?;
        self.chains
            .values()
            .map(|record| self.chain_view(record, &factors))
            .collect()
    }

    fn chain_view(
        &self,
        record: &ChainRecord,
        factors: &BTreeMap<ChainId, u128>,
    ) -> Result<ChainInfo, SeigError> {
        let ledger = self
            .ledgers
            .get(&record.id)
            .ok_or(SeigError::UnknownChain(record.id))?;
        let factor = factors.get(&record.id).copied().unwrap_or(ledger.factor());
        Ok(ChainInfo {
            id: record.id,
            registered_at: record.registered_at,
            last_commit_tick: record.last_commit_tick,
            commit_count: record.commit_count,
            total_stake: ledger.total_effective_at(factor)?,
            factor,
            stakers: ledger.len(),
        })
    }

    // ---------------------------------------------------------------
    // Deposits and withdrawals
    // ---------------------------------------------------------------

    /// Stake `amount` wrapped units from `staker` on `chain`.
    ///
    /// The staker must have approved the custody account for `amount`.
    /// Returns the staker's effective balance on the chain afterwards.
    pub fn deposit(&mut self, chain: ChainId, staker: StakerId, amount: Amount) -> Result<Amount, SeigError> {
        let now = self.now();
        self.deposit_at(chain, staker, amount, now)
    }

    fn deposit_at(
        &mut self,
        chain: ChainId,
        staker: StakerId,
        amount: Amount,
        now: Tick,
    ) -> Result<Amount, SeigError> {
        self.ensure_chain(&chain)?;
        if amount == 0 {
            return Err(SeigError::InvalidAmount("deposit amount must be positive".to_string()));
        }
        self.catch_up_at(now)?;

        let custody = self.config.custody;
        let ledger = self
            .ledgers
            .get_mut(&chain)
            .ok_or(SeigError::UnknownChain(chain))?;
        let principal = ledger.mint(staker, amount)?;
        if let Err(e) = self
            .asset
            .transfer_from(Asset::Wrapped, &custody, &staker, &custody, amount)
        {
            ledger.burn_principal(staker, principal)?;
            return Err(e.into());
        }
        tot::sync_chain(&mut self.tot, chain, ledger)?;
        let stake = ledger.effective_balance_of(&staker)?;

        self.notify_lottery(staker, now)?;
        info!(chain = %chain, staker = %staker, amount, stake, "deposit");
        Ok(stake)
    }

    /// Stake from the base currency: wrap `base_amount`, approve custody,
    /// and deposit the wrapped amount. Unwinds the wrap if the deposit fails.
    pub fn deposit_base(
        &mut self,
        chain: ChainId,
        staker: StakerId,
        base_amount: u128,
    ) -> Result<Amount, SeigError> {
        self.ensure_chain(&chain)?;
        if base_amount == 0 {
            return Err(SeigError::InvalidAmount("deposit amount must be positive".to_string()));
        }
        let now = self.now();
        let custody = self.config.custody;
        let wrapped = self.asset.wrap(&staker, base_amount)?;
        let prior_allowance = self.asset.allowance(Asset::Wrapped, &staker, &custody);
        self.asset.approve(
            Asset::Wrapped,
            &staker,
            &custody,
            prior_allowance.saturating_add(wrapped),
        );
        match self.deposit_at(chain, staker, wrapped, now) {
            Ok(stake) => Ok(stake),
            Err(e) => {
                self.asset
                    .approve(Asset::Wrapped, &staker, &custody, prior_allowance);
                self.asset.unwrap(&staker, wrapped)?;
                Err(e)
            }
        }
    }

    /// Burn `amount` from the staker's balance now and queue its payout.
    ///
    /// Returns the index of the new request.
    pub fn request_withdrawal(
        &mut self,
        chain: ChainId,
        staker: StakerId,
        amount: Amount,
    ) -> Result<usize, SeigError> {
        self.ensure_chain(&chain)?;
        if amount == 0 {
            return Err(SeigError::InvalidAmount("withdrawal amount must be positive".to_string()));
        }
        let now = self.now();
        self.catch_up_at(now)?;

        let ledger = self
            .ledgers
            .get_mut(&chain)
            .ok_or(SeigError::UnknownChain(chain))?;
        ledger.burn(staker, amount)?;
        tot::sync_chain(&mut self.tot, chain, ledger)?;
        let index = self
            .requests
            .entry((chain, staker))
            .or_default()
            .push(amount, now);

        self.notify_lottery(staker, now)?;
        info!(chain = %chain, staker = %staker, amount, index, tick = now, "withdrawal requested");
        Ok(index)
    }

    /// Pay out every consecutive ready request from the oldest pending one.
    ///
    /// Seigniorage accrued up to now is minted before custody pays out.
    pub fn process_request(
        &mut self,
        chain: ChainId,
        staker: StakerId,
        payout_in_base: bool,
    ) -> Result<ProcessOutcome, SeigError> {
        self.ensure_chain(&chain)?;
        let now = self.now();
        let delay = self.config.withdrawal_delay;
        let queue = self
            .requests
            .get(&(chain, staker))
            .filter(|q| q.num_pending() > 0)
            .ok_or(SeigError::NoPendingRequests)?;
        let batch = queue.ready_batch(now, delay)?;
        if batch.count == 0 {
            let ready_at = queue
                .oldest_pending()
                .map(|r| r.ready_at(delay))
                .unwrap_or(now);
            return Err(SeigError::WithdrawalDelayNotElapsed { ready_at, now });
        }
        self.catch_up_at(now)?;

        let custody = self.config.custody;
        self.asset
            .transfer(Asset::Wrapped, &custody, &staker, batch.total)?;
        let (payout_asset, payout_amount) = if payout_in_base {
            match self.asset.unwrap(&staker, batch.total) {
                Ok(base) => (Asset::Base, base),
                Err(e) => {
                    self.asset
                        .transfer(Asset::Wrapped, &staker, &custody, batch.total)?;
                    return Err(e.into());
                }
            }
        } else {
            (Asset::Wrapped, batch.total)
        };

        if let Some(queue) = self.requests.get_mut(&(chain, staker)) {
            queue.mark_processed(batch.count);
        }
        info!(
            chain = %chain,
            staker = %staker,
            processed = batch.count,
            amount = batch.total,
            %payout_asset,
            "withdrawal processed"
        );
        Ok(ProcessOutcome {
            processed: batch.count,
            amount: batch.total,
            payout_asset,
            payout_amount,
        })
    }

    /// Cancel the oldest pending request and stake its amount again.
    ///
    /// Returns the amount redeposited.
    pub fn redeposit(&mut self, chain: ChainId, staker: StakerId) -> Result<Amount, SeigError> {
        let now = self.now();
        self.redeposit_at(chain, staker, now)
    }

    fn redeposit_at(
        &mut self,
        chain: ChainId,
        staker: StakerId,
        now: Tick,
    ) -> Result<Amount, SeigError> {
        self.ensure_chain(&chain)?;
        let amount = self
            .requests
            .get(&(chain, staker))
            .and_then(|q| q.oldest_pending())
            .map(|r| r.amount)
            .ok_or(SeigError::NoPendingRequests)?;
        self.catch_up_at(now)?;

        let ledger = self
            .ledgers
            .get_mut(&chain)
            .ok_or(SeigError::UnknownChain(chain))?;
        ledger.mint(staker, amount)?;
        tot::sync_chain(&mut self.tot, chain, ledger)?;
        let cancelled = self
            .requests
            .get_mut(&(chain, staker))
            .and_then(|q| q.cancel_oldest());

        self.notify_lottery(staker, now)?;
        debug!(chain = %chain, staker = %staker, amount, ?cancelled, "redeposited");
        Ok(amount)
    }

    /// Up to `count` sequential redeposits, stopping when no request is pending.
    ///
    /// Each redeposit commits on its own. If one fails after at least one
    /// has succeeded, the batch stops there and the summary reports the
    /// redeposits that took effect; the failed request stays pending. A
    /// failure on the first redeposit is returned as the error.
    pub fn redeposit_multi(
        &mut self,
        chain: ChainId,
        staker: StakerId,
        count: usize,
    ) -> Result<RedepositSummary, SeigError> {
        self.ensure_chain(&chain)?;
        if count == 0 {
            return Err(SeigError::InvalidAmount("redeposit count must be positive".to_string()));
        }
        if self.num_pending_requests(chain, staker)? == 0 {
            return Err(SeigError::NoPendingRequests);
        }
        let now = self.now();
        let mut summary = RedepositSummary {
            redeposited: 0,
            amount: 0,
        };
        while summary.redeposited < count && self.num_pending_requests(chain, staker)? > 0 {
            let amount = match self.redeposit_at(chain, staker, now) {
                Ok(amount) => amount,
                Err(e) if summary.redeposited > 0 => {
                    warn!(
                        chain = %chain,
                        staker = %staker,
                        redeposited = summary.redeposited,
                        error = %e,
                        "redeposit batch stopped early"
                    );
                    break;
                }
                Err(e) => return Err(e),
            };
            summary.redeposited += 1;
            summary.amount = summary.amount.saturating_add(amount);
        }
        info!(
            chain = %chain,
            staker = %staker,
            requested = count,
            redeposited = summary.redeposited,
            "redeposit batch"
        );
        Ok(summary)
    }

    pub fn num_requests(&self, chain: ChainId, staker: StakerId) -> Result<usize, SeigError> {
        self.ensure_chain(&chain)?;
        Ok(self
            .requests
            .get(&(chain, staker))
            .map_or(0, |q| q.num_requests()))
    }

    pub fn num_pending_requests(&self, chain: ChainId, staker: StakerId) -> Result<usize, SeigError> {
        self.ensure_chain(&chain)?;
        Ok(self
            .requests
            .get(&(chain, staker))
            .map_or(0, |q| q.num_pending()))
    }

    pub fn withdrawal_request(
        &self,
        chain: ChainId,
        staker: StakerId,
        index: usize,
    ) -> Result<Option<WithdrawalRequest>, SeigError> {
        self.ensure_chain(&chain)?;
        Ok(self
            .requests
            .get(&(chain, staker))
            .and_then(|q| q.get(index))
            .cloned())
    }

    /// All requests of a staker on a chain, oldest first.
    pub fn withdrawal_requests(
        &self,
        chain: ChainId,
        staker: StakerId,
    ) -> Result<Vec<WithdrawalRequest>, SeigError> {
        self.ensure_chain(&chain)?;
        Ok(self
            .requests
            .get(&(chain, staker))
            .map(|q| q.requests().to_vec())
            .unwrap_or_default())
    }

    pub fn pending_amount(&self, chain: ChainId, staker: StakerId) -> Result<Amount, SeigError> {
        self.ensure_chain(&chain)?;
        Ok(self
            .requests
            .get(&(chain, staker))
            .map_or(0, |q| q.pending_amount()))
    }

    // ---------------------------------------------------------------
    // Stake queries
    // ---------------------------------------------------------------

    /// Effective balance on one chain, including seigniorage not yet minted.
    pub fn stake_of(&self, chain: ChainId, staker: StakerId) -> Result<Amount, SeigError> {
        let ledger = self
            .ledgers
            .get(&chain)
            .ok_or(SeigError::UnknownChain(chain))?;
        let factors = self.projected_factors(self.now())?;
        let factor = factors.get(&chain).copied().unwrap_or(ledger.factor());
        Ok(to_effective(ledger.principal_of(&staker), factor)?)
    }

    /// Effective balance summed over every chain.
    pub fn total_stake_of(&self, staker: StakerId) -> Result<Amount, SeigError> {
        let factors = self.projected_factors(self.now())?;
        let mut total: Amount = 0;
        for (chain, ledger) in &self.ledgers {
            let factor = factors.get(chain).copied().unwrap_or(ledger.factor());
            let stake = to_effective(ledger.principal_of(&staker), factor)?;
            total = checked_add(total, stake, "total_stake_of")?;
        }
        Ok(total)
    }

    /// Push the staker's current total stake to the lottery.
    fn notify_lottery(&mut self, staker: StakerId, now: Tick) -> Result<(), SeigError> {
        let mut total: Amount = 0;
        for ledger in self.ledgers.values() {
            total = checked_add(total, ledger.effective_balance_of(&staker)?, "notify_lottery")?;
        }
        self.lottery.update_stake(staker, total, now)
    }

    // ---------------------------------------------------------------
    // Lottery
    // ---------------------------------------------------------------

    pub fn lottery_init(&mut self) -> Result<(), SeigError> {
        self.lottery.init()
    }

    /// Open round 0 at the current tick.
    pub fn lottery_start(&mut self) -> Result<LotteryRound, SeigError> {
        let now = self.now();
        if self.lottery.state() != LotteryState::Initialized {
            // Let the lottery report the precise state error.
            self.lottery.start(now)?;
        }
        self.catch_up_at(now)?;
        self.lottery.start(now)?;
        self.lottery
            .current_round()
            .cloned()
            .ok_or_else(|| SeigError::InvalidState("no open round after start".to_string()))
    }

    /// End the open round, pay the winner in the base currency, and open the next.
    ///
    /// Returns the ended round.
    pub fn lottery_end_round(&mut self) -> Result<LotteryRound, SeigError> {
        let now = self.now();
        if !self.lottery.is_running() {
            return Err(SeigError::InvalidState("lottery not running".to_string()));
        }
        if let Some(round) = self.lottery.current_round() {
            if now < round.end_tick {
                return Err(SeigError::RoundNotFinished {
                    index: round.index,
                    ends_at: round.end_tick,
                    now,
                });
            }
        }
        self.catch_up_at(now)?;

        let close = self
            .lottery
            .plan_close(now, self.entropy.as_ref(), self.config.entropy_salt.as_bytes())?;
        if let (Some(winner), true) = (close.winner, close.payout > 0) {
            let pool = self.config.lottery_account;
            self.asset
                .transfer(Asset::Wrapped, &pool, &winner, close.payout)?;
            if let Err(e) = self.asset.unwrap(&winner, close.payout) {
                self.asset
                    .transfer(Asset::Wrapped, &winner, &pool, close.payout)?;
                return Err(e.into());
            }
        }
        let ended = self.lottery.apply_close(close)?;
        Ok(ended.clone())
    }

    pub fn lottery_power_of(&self, staker: &StakerId) -> Result<u128, SeigError> {
        self.lottery.power_of(staker, self.now())
    }

    pub fn lottery_winner_of(&self, index: u64) -> Result<Option<StakerId>, SeigError> {
        self.lottery.winner_of(index)
    }

    pub fn lottery_round(&self, index: u64) -> Result<LotteryRound, SeigError> {
        self.lottery
            .round(index)
            .cloned()
            .ok_or(SeigError::RoundNotFound(index))
    }

    pub fn lottery_current_round(&self) -> Option<LotteryRound> {
        self.lottery.current_round().cloned()
    }

    /// True when the open round's end tick has passed.
    pub fn round_due(&self) -> bool {
        let now = self.now();
        self.lottery.is_running()
            && self
                .lottery
                .current_round()
                .is_some_and(|r| now >= r.end_tick)
    }

    // ---------------------------------------------------------------
    // Status
    // ---------------------------------------------------------------

    pub fn status(&self) -> Result<EngineStatus, SeigError> {
        let now = self.now();
        let factors = self.projected_factors(now)?;
        let mut total_staked: Amount = 0;
        for (chain, ledger) in &self.ledgers {
            let factor = factors.get(chain).copied().unwrap_or(ledger.factor());
            total_staked = checked_add(total_staked, ledger.total_effective_at(factor)?, "status")?;
        }
        Ok(EngineStatus {
            now,
            last_mint_tick: self.minter.last_mint_tick(),
            per_tick_rate: self.minter.per_tick_rate(),
            chains: self.chains.len(),
            total_staked,
            lottery_state: self.lottery.state(),
            current_round: self.lottery.current_round().map(|r| r.index),
        })
    }
}
