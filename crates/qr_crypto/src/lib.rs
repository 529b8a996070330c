//! qr_crypto — Quantum Relay cryptographic primitives
//!
//! # Design principles
//! - The KEM is a SIMULATION of a lattice KEM: correct shapes and sizes,
//!   no real key agreement. Production deployments must swap in a genuine
//!   implementation (e.g. ML-KEM via an audited crate).
//! - Everything else is real: AES-256-GCM, HKDF-SHA256, HMAC-SHA256, all
//!   from audited RustCrypto crates. No custom constructions.
//! - Secret material (private keys, shared secrets, session keys, the
//!   master secret) is zeroized on drop.
//!
//! # Module layout
//! - `entropy` — remote quantum-entropy fetch with silent CSPRNG fallback
//! - `kem`     — simulated Kyber-style key encapsulation (fixed sizes)
//! - `kdf`     — session-key derivation: HKDF and context-bound HMAC
//! - `context` — canonical conversation identity (direct pair / group)
//! - `aead`    — AES-256-GCM with explicit IV and tag handling
//! - `sign`    — simulated Dilithium signature stub (opaque store column)
//! - `error`   — unified error type

pub mod aead;
pub mod context;
pub mod entropy;
pub mod error;
pub mod kdf;
pub mod kem;
pub mod sign;

pub use context::ConversationContext;
pub use error::CryptoError;
pub use kdf::{MasterSecret, SessionKey};
