//! Deployment-time configuration for the encryption service.

use qr_crypto::entropy::DEFAULT_ENTROPY_URL;
use qr_crypto::{CryptoError, MasterSecret};

/// Which derivation strategy seals new messages.
///
/// The two strategies are mutually incompatible for one deployment: a
/// receiver configured for `ContextBound` cannot open an envelope sealed
/// under `Hkdf` (it lacks the KEM private key), and vice versa. This is a
/// deployment choice, made explicit here rather than resolved silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Keys are a pure function of (master secret, conversation context).
    /// Re-derivable on demand by any holder of the master secret; no
    /// forward secrecy. The default: the simulated KEM cannot produce
    /// agreeing secrets across processes, so `Hkdf` only round-trips
    /// inside a single service instance.
    #[default]
    ContextBound,
    /// Per-message KEM round + HKDF. The salt and KEM ciphertext travel
    /// with the envelope. With the simulated KEM a remote receiver's
    /// decapsulated candidate differs from the sender's secret, so opens
    /// fail authentication until a real KEM is substituted.
    Hkdf,
}

/// Service configuration. The master secret is injected here, never read
/// from a global, so tests can run distinct secrets per scenario.
#[derive(Clone)]
pub struct RelayConfig {
    pub strategy: KeyStrategy,
    pub master_secret: MasterSecret,
    /// `None` disables the remote entropy fetch (local CSPRNG only).
    pub entropy_url: Option<String>,
}

impl RelayConfig {
    /// Read configuration from the environment.
    ///
    /// - `QRELAY_STRATEGY` — `context` (default) or `hkdf`
    /// - `QRELAY_MASTER_SECRET` — 64 hex chars, required
    /// - `QRELAY_ENTROPY_URL` — QRNG endpoint; `off` disables the fetch
    pub fn from_env() -> Result<Self, CryptoError> {
        let strategy = match std::env::var("QRELAY_STRATEGY").as_deref() {
            Ok("hkdf") => KeyStrategy::Hkdf,
            _ => KeyStrategy::ContextBound,
        };

        let master_secret = std::env::var("QRELAY_MASTER_SECRET")
            .map_err(|_| CryptoError::InvalidKey("QRELAY_MASTER_SECRET is not set".into()))
            .and_then(|hex_str| MasterSecret::from_hex(&hex_str))?;

        let entropy_url = match std::env::var("QRELAY_ENTROPY_URL") {
            Ok(url) if url == "off" => None,
            Ok(url) => Some(url),
            Err(_) => Some(DEFAULT_ENTROPY_URL.to_string()),
        };

        Ok(Self { strategy, master_secret, entropy_url })
    }

    /// Local-only config for tests: no network entropy, context strategy.
    pub fn for_tests(master_secret: MasterSecret) -> Self {
        Self { strategy: KeyStrategy::ContextBound, master_secret, entropy_url: None }
    }
}
