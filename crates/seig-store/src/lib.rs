// crates/seig-store/src/lib.rs
//
// seig-store: Storage layer for the seigniorage staking service.
//
// Provides a RocksDB-backed and an in-memory implementation of the core
// `KvStore` trait, and `EngineStore`, which persists a StakingEngine as one
// key per entity in a single versioned batch.

pub mod engine_store;
pub mod memory;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use engine_store::EngineStore;
pub use memory::MemoryStore;
pub use rocks::RocksStore;
