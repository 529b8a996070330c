//! qr_relay — the Quantum Relay encryption service
//!
//! Orchestrates the primitives behind `seal(plaintext, context)` /
//! `open(envelope, context)`, exposed as typed calls plus JSON
//! request/response handlers. Stateless and idempotent: identical inputs
//! (including master secret or transmitted salt) always yield identical
//! results, so the service is safely callable concurrently across
//! conversations.
//!
//! # Modules
//! - `config`  — deployment-time strategy selection and key material
//! - `service` — seal/open orchestration and boundary handlers
//! - `error`   — service error type

pub mod config;
pub mod error;
pub mod service;

pub use config::{KeyStrategy, RelayConfig};
pub use error::ServiceError;
pub use service::{RelayEncryptionService, SealedMessage};
