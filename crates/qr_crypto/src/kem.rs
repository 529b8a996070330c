//! Simulated post-quantum KEM (Kyber-style shape).
//!
//! SIMULATION ONLY. This reproduces the external shape of a Kyber512-class
//! KEM: fixed key/ciphertext sizes and the two-call encapsulate/decapsulate
//! API. It does NOT perform a real key agreement. `encapsulate` binds a
//! fresh secret to the public key via HMAC; `decapsulate` derives a
//! deterministic candidate from (ciphertext, private key). The two secrets
//! do NOT agree, so callers must never rely on cross-party agreement.
//! A production deployment must substitute a genuine KEM (e.g. ML-KEM)
//! behind the same API.

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroizing, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Name of the simulated parameter set (Kyber512-shaped sizes).
pub const PARAMETER_SET: &str = "SIM-KYBER512";

/// Byte sizes for the simulated parameter set.
pub mod sizes {
    /// Public key size in bytes.
    pub const PUBLIC_KEY: usize = 800;
    /// Private key size in bytes.
    pub const PRIVATE_KEY: usize = 1632;
    /// Encapsulation ciphertext size in bytes.
    pub const CIPHERTEXT: usize = 768;
    /// Shared secret size in bytes.
    pub const SHARED_SECRET: usize = 32;
}

type HmacSha256 = Hmac<Sha256>;

/// 32-byte shared secret. Must never leave the boundary that produced it.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret(pub [u8; sizes::SHARED_SECRET]);

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedSecret").field(&"<redacted>").finish()
    }
}

/// Ephemeral KEM key pair at the configured lengths. Never persisted.
pub struct KemKeyPair {
    pub public_key: Vec<u8>,
    private_key: Zeroizing<Vec<u8>>,
}

impl KemKeyPair {
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }
}

/// Result of `encapsulate`: the secret stays local, the ciphertext travels.
#[derive(Debug)]
pub struct EncapsulationResult {
    pub shared_secret: SharedSecret,
    pub ciphertext: Vec<u8>,
}

/// Generate a key pair at the configured lengths.
///
/// Simulation: uniform random bytes. A real KEM derives these from lattice
/// polynomial sampling.
pub fn generate_keypair() -> KemKeyPair {
    let mut public_key = vec![0u8; sizes::PUBLIC_KEY];
    let mut private_key = Zeroizing::new(vec![0u8; sizes::PRIVATE_KEY]);
    OsRng.fill_bytes(&mut public_key);
    OsRng.fill_bytes(&mut private_key);
    KemKeyPair { public_key, private_key }
}

/// Encapsulate a fresh shared secret for `public_key`.
///
/// The ciphertext is HMAC-SHA256(secret, public_key) padded with random
/// bytes to the fixed ciphertext size, binding the secret to the key.
pub fn encapsulate(public_key: &[u8]) -> Result<EncapsulationResult, CryptoError> {
    if public_key.len() != sizes::PUBLIC_KEY {
        return Err(CryptoError::InvalidKeySize {
            expected: sizes::PUBLIC_KEY,
            got: public_key.len(),
        });
    }

    let mut secret = [0u8; sizes::SHARED_SECRET];
    OsRng.fill_bytes(&mut secret);

    let mut mac = HmacSha256::new_from_slice(&secret)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    mac.update(public_key);
    let binding = mac.finalize().into_bytes();

    let mut ciphertext = Vec::with_capacity(sizes::CIPHERTEXT);
    ciphertext.extend_from_slice(&binding);
    let mut padding = vec![0u8; sizes::CIPHERTEXT - binding.len()];
    OsRng.fill_bytes(&mut padding);
    ciphertext.extend_from_slice(&padding);

    Ok(EncapsulationResult { shared_secret: SharedSecret(secret), ciphertext })
}

/// Recover a candidate shared secret from `ciphertext` and `private_key`.
///
/// Simulation: SHA-256(ciphertext || private_key). Deterministic, but NOT
/// equal to the secret `encapsulate` produced; only a real KEM closes that
/// loop.
pub fn decapsulate(ciphertext: &[u8], private_key: &[u8]) -> Result<SharedSecret, CryptoError> {
    if ciphertext.len() != sizes::CIPHERTEXT {
        return Err(CryptoError::InvalidCiphertextSize {
            expected: sizes::CIPHERTEXT,
            got: ciphertext.len(),
        });
    }
    if private_key.len() != sizes::PRIVATE_KEY {
        return Err(CryptoError::InvalidKeySize {
            expected: sizes::PRIVATE_KEY,
            got: private_key.len(),
        });
    }

    let mut hasher = Sha256::new();
    hasher.update(ciphertext);
    hasher.update(private_key);
    let digest = hasher.finalize();

    let mut secret = [0u8; sizes::SHARED_SECRET];
    secret.copy_from_slice(&digest);
    Ok(SharedSecret(secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_has_configured_lengths() {
        let pair = generate_keypair();
        assert_eq!(pair.public_key.len(), sizes::PUBLIC_KEY);
        assert_eq!(pair.private_key().len(), sizes::PRIVATE_KEY);
    }

    #[test]
    fn encapsulate_produces_fixed_sizes() {
        let pair = generate_keypair();
        let result = encapsulate(&pair.public_key).expect("encapsulate");
        assert_eq!(result.ciphertext.len(), sizes::CIPHERTEXT);
        assert_eq!(result.shared_secret.0.len(), sizes::SHARED_SECRET);
    }

    #[test]
    fn encapsulate_rejects_wrong_key_size() {
        let err = encapsulate(&[0u8; 799]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeySize { expected: 800, got: 799 }));
    }

    #[test]
    fn decapsulate_rejects_wrong_sizes() {
        let pair = generate_keypair();
        let err = decapsulate(&[0u8; 767], pair.private_key()).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidCiphertextSize { .. }));

        let err = decapsulate(&[0u8; sizes::CIPHERTEXT], &[0u8; 100]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeySize { .. }));
    }

    #[test]
    fn decapsulate_is_deterministic() {
        // Shape-level property only: same inputs, same candidate secret.
        // Agreement with encapsulate's secret is NOT a property of the
        // simulation and is deliberately untested.
        let pair = generate_keypair();
        let result = encapsulate(&pair.public_key).expect("encapsulate");
        let a = decapsulate(&result.ciphertext, pair.private_key()).expect("decapsulate");
        let b = decapsulate(&result.ciphertext, pair.private_key()).expect("decapsulate");
        assert_eq!(a.0, b.0);
    }
}
