// crates/seig-store/src/engine_store.rs
//
// Persistence of StakingEngine state on top of any KvStore.
//
// Key format (values are JSON):
//   - `minter`                        -> SeigniorageMinter
//   - `chain:{chain_hex}`             -> ChainRecord
//   - `ledger:{chain_hex}`            -> per-chain FixedPointLedger
//   - `ledger:tot`                    -> aggregate ledger
//   - `requests:{chain_hex}:{staker_hex}` -> RequestQueue
//   - `lottery`                       -> RewardLottery (without ended rounds)
//   - `round:{index:020}`             -> ended LotteryRound
//   - `asset`                         -> asset service state, when persisted
//   - `meta:version`                  -> u64 big-endian snapshot version
//
// Every save writes one atomic batch after claiming the next snapshot version
// with a compare-and-swap on `meta:version`. A writer whose view of the
// version is stale fails instead of interleaving its snapshot with another
// writer's.
//
// Ended rounds never change, so a save writes only rounds at or past the
// store's round cursor. Request queues are rewritten only when their encoding
// differs from what this store last wrote or loaded.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use seig_core::{Address, AssetService, BatchOp, KvStore, SeigError};
use seig_economics::{EngineSnapshot, StakingEngine};

const VERSION_KEY: &[u8] = b"meta:version";
const MINTER_KEY: &[u8] = b"minter";
const TOT_KEY: &[u8] = b"ledger:tot";
const LOTTERY_KEY: &[u8] = b"lottery";
const ASSET_KEY: &[u8] = b"asset";
const CHAIN_PREFIX: &str = "chain:";
const LEDGER_PREFIX: &str = "ledger:";
const REQUESTS_PREFIX: &str = "requests:";
const ROUND_PREFIX: &str = "round:";

/// What this store knows to be on disk.
#[derive(Debug, Default)]
struct Persisted {
    /// Last version this store wrote or loaded.
    version: u64,
    /// Ended rounds below this index are already stored.
    rounds: u64,
    /// Digest of each request queue's stored encoding, by key.
    queues: BTreeMap<Vec<u8>, u64>,
}

/// Snapshot persistence for a StakingEngine.
pub struct EngineStore {
    kv: Arc<dyn KvStore>,
    persisted: Mutex<Persisted>,
}

impl EngineStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            persisted: Mutex::new(Persisted::default()),
        }
    }

    /// Snapshot version this store last wrote or loaded (0 before either).
    pub fn version(&self) -> u64 {
        self.persisted.lock().map(|p| p.version).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Persisted>, SeigError> {
        self.persisted
            .lock()
            .map_err(|e| SeigError::Storage(format!("snapshot state lock poisoned: {}", e)))
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SeigError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T, SeigError> {
        serde_json::from_slice(bytes).map_err(|e| {
            SeigError::Serialization(format!(
                "failed to decode {}: {}",
                String::from_utf8_lossy(key),
                e
            ))
        })
    }

    fn read_version(&self) -> Result<Option<u64>, SeigError> {
        match self.kv.get(VERSION_KEY)? {
            None => Ok(None),
            Some(bytes) => {
                let array: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    SeigError::Serialization("meta:version must be 8 bytes".to_string())
                })?;
                Ok(Some(u64::from_be_bytes(array)))
            }
        }
    }

    /// Persist the engine's state, and the asset service's if `A` is serializable.
    ///
    /// Returns the new snapshot version.
    pub fn save<A>(&self, engine: &StakingEngine<A>) -> Result<u64, SeigError>
    where
        A: AssetService + Serialize,
    {
        let asset = Self::encode(engine.asset())?;
        self.write_snapshot(&engine.snapshot(), Some(asset))
    }

    /// Persist a snapshot without asset state.
    pub fn save_snapshot(&self, snapshot: &EngineSnapshot) -> Result<u64, SeigError> {
        self.write_snapshot(snapshot, None)
    }

    fn write_snapshot(
        &self,
        snapshot: &EngineSnapshot,
        asset: Option<Vec<u8>>,
    ) -> Result<u64, SeigError> {
        let mut persisted = self.lock()?;

        let mut ops: Vec<BatchOp> = Vec::new();
        ops.push((MINTER_KEY.to_vec(), Some(Self::encode(&snapshot.minter)?)));
        ops.push((TOT_KEY.to_vec(), Some(Self::encode(&snapshot.tot)?)));
        ops.push((LOTTERY_KEY.to_vec(), Some(Self::encode(&snapshot.lottery)?)));
        for (id, record) in &snapshot.chains {
            ops.push((chain_key(id), Some(Self::encode(record)?)));
        }
        for (id, ledger) in &snapshot.ledgers {
            ops.push((ledger_key(id), Some(Self::encode(ledger)?)));
        }

        let mut queues = BTreeMap::new();
        for ((chain, staker), queue) in &snapshot.requests {
            let key = requests_key(chain, staker);
            let value = Self::encode(queue)?;
            let digest = digest(&value);
            if persisted.queues.get(&key) != Some(&digest) {
                ops.push((key.clone(), Some(value)));
            }
            queues.insert(key, digest);
        }

        let mut rounds = persisted.rounds;
        for round in snapshot.lottery.ended_rounds() {
            if round.index >= persisted.rounds {
                ops.push((round_key(round.index), Some(Self::encode(round)?)));
            }
            rounds = rounds.max(round.index + 1);
        }

        if let Some(asset) = asset {
            ops.push((ASSET_KEY.to_vec(), Some(asset)));
        }

        let expected = (persisted.version > 0).then(|| persisted.version.to_be_bytes());
        let next = persisted.version + 1;
        if !self
            .kv
            .compare_and_swap(VERSION_KEY, expected.as_ref().map(|b| &b[..]), &next.to_be_bytes())?
        {
            let found = self.read_version()?;
            return Err(SeigError::Storage(format!(
                "snapshot version conflict: expected {}, found {:?}",
                persisted.version, found
            )));
        }
        persisted.version = next;
        let count = ops.len();
        self.kv.write_batch(ops)?;
        persisted.rounds = rounds;
        persisted.queues = queues;
        debug!(version = next, entries = count, "engine snapshot saved");
        Ok(next)
    }

    /// Load the persisted engine state, or `None` if nothing was saved yet.
    pub fn load_snapshot(&self) -> Result<Option<EngineSnapshot>, SeigError> {
        let Some(minter_bytes) = self.kv.get(MINTER_KEY)? else {
            return Ok(None);
        };
        let minter = Self::decode(MINTER_KEY, &minter_bytes)?;
        let tot = match self.kv.get(TOT_KEY)? {
            Some(bytes) => Self::decode(TOT_KEY, &bytes)?,
            None => Default::default(),
        };
        let mut lottery: seig_economics::RewardLottery = match self.kv.get(LOTTERY_KEY)? {
            Some(bytes) => Self::decode(LOTTERY_KEY, &bytes)?,
            None => {
                return Err(SeigError::Storage(
                    "snapshot is missing the lottery entry".to_string(),
                ))
            }
        };

        let mut chains = BTreeMap::new();
        for (key, value) in self.kv.scan_prefix(CHAIN_PREFIX.as_bytes())? {
            let id = parse_address(&key, CHAIN_PREFIX)?;
            chains.insert(id, Self::decode(&key, &value)?);
        }

        let mut ledgers = BTreeMap::new();
        for (key, value) in self.kv.scan_prefix(LEDGER_PREFIX.as_bytes())? {
            if key.as_slice() == TOT_KEY {
                continue;
            }
            let id = parse_address(&key, LEDGER_PREFIX)?;
            ledgers.insert(id, Self::decode(&key, &value)?);
        }

        let mut requests = BTreeMap::new();
        let mut queues = BTreeMap::new();
        for (key, value) in self.kv.scan_prefix(REQUESTS_PREFIX.as_bytes())? {
            let rest = key_suffix(&key, REQUESTS_PREFIX)?;
            let (chain, staker) = rest.split_once(':').ok_or_else(|| {
                SeigError::Serialization(format!("malformed requests key {}", rest))
            })?;
            let chain: Address = chain.parse()?;
            let staker: Address = staker.parse()?;
            requests.insert((chain, staker), Self::decode(&key, &value)?);
            queues.insert(key, digest(&value));
        }

        let mut rounds: Vec<seig_economics::LotteryRound> = Vec::new();
        for (key, value) in self.kv.scan_prefix(ROUND_PREFIX.as_bytes())? {
            rounds.push(Self::decode(&key, &value)?);
        }
        let round_cursor = rounds.iter().map(|r| r.index + 1).max().unwrap_or(0);
        lottery.restore_history(rounds);

        let version = self.read_version()?.unwrap_or(0);
        let mut persisted = self.lock()?;
        persisted.version = version;
        persisted.rounds = round_cursor;
        persisted.queues = queues;

        debug!(chains = chains.len(), "engine snapshot loaded");
        Ok(Some(EngineSnapshot {
            minter,
            chains,
            ledgers,
            tot,
            requests,
            lottery,
        }))
    }

    /// Load persisted asset service state.
    pub fn load_asset<A: DeserializeOwned>(&self) -> Result<Option<A>, SeigError> {
        match self.kv.get(ASSET_KEY)? {
            Some(bytes) => Ok(Some(Self::decode(ASSET_KEY, &bytes)?)),
            None => Ok(None),
        }
    }
}

fn chain_key(id: &Address) -> Vec<u8> {
    format!("{}{}", CHAIN_PREFIX, id.to_hex()).into_bytes()
}

fn ledger_key(id: &Address) -> Vec<u8> {
    format!("{}{}", LEDGER_PREFIX, id.to_hex()).into_bytes()
}

fn requests_key(chain: &Address, staker: &Address) -> Vec<u8> {
    format!("{}{}:{}", REQUESTS_PREFIX, chain.to_hex(), staker.to_hex()).into_bytes()
}

fn digest(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

fn round_key(index: u64) -> Vec<u8> {
    // Zero-padded so byte order matches numeric order.
    format!("{}{:020}", ROUND_PREFIX, index).into_bytes()
}

fn key_suffix<'a>(key: &'a [u8], prefix: &str) -> Result<&'a str, SeigError> {
    let text = std::str::from_utf8(key)
        .map_err(|e| SeigError::Serialization(format!("non-utf8 key: {}", e)))?;
    text.strip_prefix(prefix)
        .ok_or_else(|| SeigError::Serialization(format!("key {} lacks prefix {}", text, prefix)))
}

fn parse_address(key: &[u8], prefix: &str) -> Result<Address, SeigError> {
    key_suffix(key, prefix)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use seig_core::{wrapped_tokens, Asset, ManualClock};
    use seig_economics::{EngineConfig, SeededEntropy, TokenLedger};

    fn engine(clock: &ManualClock) -> StakingEngine<TokenLedger> {
        StakingEngine::new(
            EngineConfig {
                round_duration: 5,
                ..EngineConfig::default()
            },
            TokenLedger::new(),
            Arc::new(SeededEntropy),
            Arc::new(clock.clone()),
        )
    }

    fn populated(clock: &ManualClock) -> StakingEngine<TokenLedger> {
        let mut engine = engine(clock);
        let chain = Address::from_label("chain-a");
        let alice = Address::from_label("alice");
        let custody = engine.config().custody;
        engine.register_chain(chain).unwrap();
        engine
            .asset_mut()
            .mint(Asset::Wrapped, &alice, wrapped_tokens(10))
            .unwrap();
        engine
            .asset_mut()
            .approve(Asset::Wrapped, &alice, &custody, wrapped_tokens(10));
        engine.deposit(chain, alice, wrapped_tokens(10)).unwrap();
        engine.lottery_init().unwrap();
        engine.lottery_start().unwrap();
        clock.set(5);
        engine.request_withdrawal(chain, alice, wrapped_tokens(1)).unwrap();
        engine.lottery_end_round().unwrap();
        engine
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let clock = ManualClock::new(0);
        let engine = populated(&clock);
        let store = EngineStore::new(Arc::new(MemoryStore::new()));

        assert_eq!(store.save(&engine).unwrap(), 1);

        let reader = EngineStore::new(store.kv.clone());
        let snapshot = reader.load_snapshot().unwrap().unwrap();
        assert_eq!(snapshot, engine.snapshot());
        assert_eq!(snapshot.lottery.ended_rounds().len(), 1);
        let asset: TokenLedger = reader.load_asset().unwrap().unwrap();
        assert_eq!(&asset, engine.asset());
        assert_eq!(reader.version(), 1);
    }

    #[test]
    fn test_empty_store_loads_none() {
        let store = EngineStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load_snapshot().unwrap().is_none());
        assert!(store.load_asset::<TokenLedger>().unwrap().is_none());
    }

    #[test]
    fn test_stale_writer_is_rejected() {
        let clock = ManualClock::new(0);
        let engine = populated(&clock);
        let kv: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let first = EngineStore::new(kv.clone());
        let second = EngineStore::new(kv.clone());

        first.save(&engine).unwrap();
        let err = second.save(&engine).unwrap_err();
        assert!(matches!(err, SeigError::Storage(_)));

        // After loading, the second writer sees the current version.
        second.load_snapshot().unwrap();
        assert_eq!(second.save(&engine).unwrap(), 2);
        assert!(first.save(&engine).is_err());
    }

    /// Keeps the keys of every batch written through it.
    struct RecordingStore {
        inner: MemoryStore,
        batches: Mutex<Vec<Vec<Vec<u8>>>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                batches: Mutex::new(Vec::new()),
            }
        }

        /// Keys under `prefix` in the most recent batch.
        fn last_batch(&self, prefix: &str) -> Vec<Vec<u8>> {
            let batches = self.batches.lock().unwrap();
            batches
                .last()
                .map(|keys| {
                    keys.iter()
                        .filter(|k| k.starts_with(prefix.as_bytes()))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    impl KvStore for RecordingStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SeigError> {
            self.inner.get(key)
        }

        fn put(&self, key: &[u8], value: &[u8]) -> Result<(), SeigError> {
            self.inner.put(key, value)
        }

        fn delete(&self, key: &[u8]) -> Result<(), SeigError> {
            self.inner.delete(key)
        }

        fn compare_and_swap(
            &self,
            key: &[u8],
            expected: Option<&[u8]>,
            new: &[u8],
        ) -> Result<bool, SeigError> {
            self.inner.compare_and_swap(key, expected, new)
        }

        fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), SeigError> {
            let keys = ops.iter().map(|(k, _)| k.clone()).collect();
            self.batches.lock().unwrap().push(keys);
            self.inner.write_batch(ops)
        }

        fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, SeigError> {
            self.inner.scan_prefix(prefix)
        }
    }

    #[test]
    fn test_save_writes_only_new_rounds_and_changed_queues() {
        let clock = ManualClock::new(0);
        let mut engine = populated(&clock);
        let kv = Arc::new(RecordingStore::new());
        let store = EngineStore::new(kv.clone());

        store.save(&engine).unwrap();
        assert_eq!(kv.last_batch(ROUND_PREFIX), vec![round_key(0)]);
        assert_eq!(kv.last_batch(REQUESTS_PREFIX).len(), 1);

        store.save(&engine).unwrap();
        assert!(kv.last_batch(ROUND_PREFIX).is_empty());
        assert!(kv.last_batch(REQUESTS_PREFIX).is_empty());
        assert!(!kv.last_batch("minter").is_empty());

        clock.set(10);
        engine.lottery_end_round().unwrap();
        store.save(&engine).unwrap();
        assert_eq!(kv.last_batch(ROUND_PREFIX), vec![round_key(1)]);

        // A store that loads from disk resumes from the stored rounds and queues.
        let reader = EngineStore::new(kv.clone());
        let snapshot = reader.load_snapshot().unwrap().unwrap();
        assert_eq!(snapshot, engine.snapshot());
        assert_eq!(snapshot.lottery.ended_rounds().len(), 2);
        assert_eq!(reader.save(&engine).unwrap(), 4);
        assert!(kv.last_batch(ROUND_PREFIX).is_empty());
        assert!(kv.last_batch(REQUESTS_PREFIX).is_empty());
    }

    #[test]
    fn test_round_keys_sort_numerically() {
        assert!(round_key(9) < round_key(10));
        assert!(round_key(99) < round_key(100));
    }
}
