//! Session-key derivation.
//!
//! Two interchangeable strategies, both yielding a 32-byte AES key:
//!
//! `derive_session_key` — HKDF-SHA256 extract-and-expand over KEM output.
//!   Deterministic given identical inputs; the (non-secret) salt must travel
//!   with the ciphertext so the receiver can re-derive.
//!
//! `ContextKeyDeriver` — HMAC-SHA256 of the canonical conversation context
//!   under a long-lived master secret. Reproducible by any holder of the
//!   master secret, no handshake state; no forward secrecy, and a master
//!   secret compromise breaks every conversation derived from it.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::context::ConversationContext;
use crate::error::CryptoError;

/// Session keys are always AES-256 sized.
pub const SESSION_KEY_LEN: usize = 32;

/// 32-byte symmetric session key. Zeroized on drop, never serialized.
#[derive(ZeroizeOnDrop)]
pub struct SessionKey(pub [u8; SESSION_KEY_LEN]);

/// Long-lived shared master secret for the context-bound strategy.
///
/// Injected at construction (config, not a global) so tests and deployments
/// can substitute distinct secrets.
#[derive(Clone, ZeroizeOnDrop)]
pub struct MasterSecret([u8; 32]);

impl MasterSecret {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse from 64 hex characters.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let decoded = hex::decode(hex_str.trim())?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("Master secret must be 32 bytes".into()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// HKDF-SHA256: expand `ikm` + `salt` + `info` into a session key.
pub fn derive_session_key(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<SessionKey, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut key = [0u8; SESSION_KEY_LEN];
    hk.expand(info, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(SessionKey(key))
}

/// Deterministic context-bound derivation under an injected master secret.
pub struct ContextKeyDeriver {
    master: MasterSecret,
}

impl ContextKeyDeriver {
    pub fn new(master: MasterSecret) -> Self {
        Self { master }
    }

    /// HMAC-SHA256(master, canonical context string).
    ///
    /// Pure function of (master, context): any party holding the master
    /// secret re-derives the identical key with no handshake.
    pub fn derive(&self, context: &ConversationContext) -> Result<SessionKey, CryptoError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.master.as_bytes())
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        mac.update(context.canonical().as_bytes());
        let digest = mac.finalize().into_bytes();

        let mut key = [0u8; SESSION_KEY_LEN];
        key.copy_from_slice(&digest);
        Ok(SessionKey(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deriver() -> ContextKeyDeriver {
        ContextKeyDeriver::new(MasterSecret::from_bytes([7u8; 32]))
    }

    #[test]
    fn hkdf_is_deterministic() {
        let a = derive_session_key(b"ikm", b"salt", b"info").expect("derive");
        let b = derive_session_key(b"ikm", b"salt", b"info").expect("derive");
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn hkdf_salt_changes_key() {
        let a = derive_session_key(b"ikm", b"salt-1", b"info").expect("derive");
        let b = derive_session_key(b"ikm", b"salt-2", b"info").expect("derive");
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn direct_chat_keys_are_symmetric() {
        let d = deriver();
        let ab = d.derive(&ConversationContext::direct("alice", "bob")).expect("derive");
        let ba = d.derive(&ConversationContext::direct("bob", "alice")).expect("derive");
        assert_eq!(ab.0, ba.0);
    }

    #[test]
    fn group_namespace_never_collides_with_pair() {
        let d = deriver();
        // Group id crafted to collide textually with the raw pair string.
        let pair = d.derive(&ConversationContext::direct("alice", "bob")).expect("derive");
        let group = d.derive(&ConversationContext::group("alice:bob")).expect("derive");
        assert_ne!(pair.0, group.0);
    }

    #[test]
    fn distinct_master_secrets_give_distinct_keys() {
        let ctx = ConversationContext::direct("alice", "bob");
        let a = ContextKeyDeriver::new(MasterSecret::from_bytes([1u8; 32]))
            .derive(&ctx)
            .expect("derive");
        let b = ContextKeyDeriver::new(MasterSecret::from_bytes([2u8; 32]))
            .derive(&ctx)
            .expect("derive");
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn master_secret_hex_roundtrip() {
        let secret = MasterSecret::from_hex(&"ab".repeat(32)).expect("parse");
        assert_eq!(secret.as_bytes(), &[0xabu8; 32]);
        assert!(MasterSecret::from_hex("deadbeef").is_err());
    }
}
