//! Simulated Dilithium signature stub.
//!
//! The store schema carries a `signature` column; this fills it with a
//! recognisable placeholder derived from the message digest. Nothing
//! verifies it. A production deployment replaces this with a real
//! post-quantum signature (e.g. ML-DSA) over the envelope.

use sha2::{Digest, Sha256};

/// Placeholder signature tag: `DILITHIUM-SIG[<first 8 hex of SHA-256>]`.
pub fn simulated_dilithium_tag(message: &str) -> String {
    let digest = Sha256::digest(message.as_bytes());
    format!("DILITHIUM-SIG[{}]", hex::encode(&digest[..4]))
}
