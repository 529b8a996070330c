//! qr_proto — Envelope, message, and API types for Quantum Relay
//!
//! All on-wire types serialise to JSON. Binary fields (iv, tag, ciphertext,
//! salt, KEM ciphertext) travel hex-encoded.
//!
//! # Modules
//! - `envelope` — the persisted ciphertext row (what the managed store sees)
//! - `message`  — the client-local decrypted message record
//! - `api`      — seal/open request/response types for the service boundary

pub mod api;
pub mod envelope;
pub mod message;

pub use envelope::EnvelopeRow;
pub use message::{MessageBody, MessageRecord};
