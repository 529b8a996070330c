//! qr_sync — the Quantum Relay client sync engine
//!
//! Timer-driven polling against the managed store: fetch every envelope
//! addressed to the local identity, decrypt through the relay service,
//! merge into an ordered deduplicated in-memory log, then purge the
//! delivered rows (one-shot delivery, the system's approximation of
//! forward secrecy). Nothing is persisted locally; the log is rebuilt from
//! empty at every process start.
//!
//! # Modules
//! - `store`  — `RelayStore` abstraction + REST and in-memory backends
//! - `log`    — ordered, deduplicated message log
//! - `engine` — the fetch/process/purge cycle and the send path
//! - `error`  — sync error type

pub mod engine;
pub mod error;
pub mod log;
pub mod store;

pub use engine::{CycleStats, SyncConfig, SyncEngine};
pub use error::SyncError;
pub use log::MessageLog;
pub use store::{MemoryStore, RelayStore, RestStore, StoreConfig};
