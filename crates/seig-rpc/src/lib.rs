// crates/seig-rpc/src/lib.rs
//
// seig-rpc: JSON-RPC server and handlers for the seigniorage staking service.
//
// A single tonic service accepts JSON envelopes naming a method, dispatches
// them to the handler modules, and persists the engine after every
// mutating call when a store is attached.

pub mod handlers;
pub mod middleware;
pub mod server;

// Re-export the main server type for ergonomic access.
pub use server::RpcConfig;
pub use server::SeigRpcServer;
pub use server::SharedEngine;
pub use server::{JsonRpcRequest, JsonRpcResponse};
