// crates/seig-economics/src/lib.rs
//
// seig-economics: coinage ledgers, seigniorage minting, the deposit manager,
// and the PowerTON lottery.
//
// All amounts are u128 wrapped-currency units (27 decimals). Ledger factors
// use the same 10^27 precision.

pub mod coinage;
pub mod deposit;
pub mod engine;
pub mod entropy;
pub mod fixed;
pub mod minter;
pub mod powerton;
pub mod token;
pub mod tot;

// Re-export key types for ergonomic access from downstream crates.
pub use coinage::FixedPointLedger;
pub use deposit::{RequestQueue, RequestStatus, WithdrawalRequest};
pub use engine::{
    ChainInfo, ChainRecord, EngineConfig, EngineSnapshot, EngineStatus, ProcessOutcome,
    RedepositSummary, StakingEngine,
};
pub use entropy::SeededEntropy;
pub use fixed::FACTOR_ONE;
pub use minter::{ChainShare, MintReport, SeigniorageMinter};
pub use powerton::{LotteryRound, LotteryState, PowerBalance, RewardLottery};
pub use token::TokenLedger;
pub use tot::{AggregateLedger, ChainLedger};
