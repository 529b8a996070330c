//! Encrypted message envelope — what the managed store sees.
//!
//! The store is a DUMB TRANSPORT: it persists opaque ciphertext plus the
//! routing metadata needed to address it:
//!   - id           (random UUID, used for dedup and purge-by-id)
//!   - sender_id    (routing + sent-log rebuild)
//!   - receiver_id  (direct chats) XOR group_id (group chats)
//!   - content/iv/auth_tag (hex AES-256-GCM parts)
//!   - kem_ciphertext/salt (hex, present only under the HKDF strategy)
//!   - signature    (opaque simulated signature tag)
//!   - created_at / expires_at
//!
//! The store cannot see plaintext or key material of any kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use qr_crypto::aead::{self, EncryptedData};
use qr_crypto::CryptoError;

/// One persisted envelope row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeRow {
    /// Random UUID, no cryptographic meaning.
    pub id: String,

    pub sender_id: String,

    /// Set for direct chats; `None` for group traffic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,

    /// Set for group traffic; `None` for direct chats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// AES-256-GCM ciphertext, hex.
    pub content: String,

    /// 12-byte IV, hex.
    pub iv: String,

    /// 16-byte authentication tag, hex.
    pub auth_tag: String,

    /// KEM encapsulation ciphertext, hex. HKDF strategy only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kem_ciphertext: Option<String>,

    /// HKDF salt, hex. HKDF strategy only; non-secret, must travel with
    /// the ciphertext so the receiver can re-derive the session key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    /// Simulated signature tag. Opaque to the store, verified by nobody.
    pub signature: String,

    pub created_at: DateTime<Utc>,

    /// Past this instant the envelope is no longer delivered, only purged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Decode hex AEAD fields into their binary parts, validating the fixed
/// IV/tag lengths.
pub fn decode_parts(iv: &str, auth_tag: &str, content: &str) -> Result<EncryptedData, CryptoError> {
    let iv_bytes = hex::decode(iv)?;
    let iv: [u8; aead::IV_LEN] = iv_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey("Envelope IV must be 12 bytes".into()))?;

    let tag_bytes = hex::decode(auth_tag)?;
    let auth_tag: [u8; aead::TAG_LEN] = tag_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey("Envelope auth tag must be 16 bytes".into()))?;

    Ok(EncryptedData { iv, auth_tag, ciphertext: hex::decode(content)? })
}

impl EnvelopeRow {
    /// Decode this row's hex AEAD fields back into binary parts.
    pub fn encrypted_data(&self) -> Result<EncryptedData, CryptoError> {
        decode_parts(&self.iv, &self.auth_tag, &self.content)
    }

    /// True once `expires_at` lies in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(iv: &str, tag: &str, content: &str) -> EnvelopeRow {
        EnvelopeRow {
            id: "e-1".into(),
            sender_id: "alice".into(),
            receiver_id: Some("bob".into()),
            group_id: None,
            content: content.into(),
            iv: iv.into(),
            auth_tag: tag.into(),
            kem_ciphertext: None,
            salt: None,
            signature: String::new(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn decodes_valid_hex_parts() {
        let r = row(&"00".repeat(12), &"11".repeat(16), "deadbeef");
        let data = r.encrypted_data().expect("decode");
        assert_eq!(data.iv, [0u8; 12]);
        assert_eq!(data.auth_tag, [0x11u8; 16]);
        assert_eq!(data.ciphertext, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn rejects_wrong_iv_length() {
        let r = row(&"00".repeat(11), &"11".repeat(16), "deadbeef");
        assert!(r.encrypted_data().is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let r = row(&"00".repeat(12), &"11".repeat(16), "not-hex!");
        assert!(r.encrypted_data().is_err());
    }

    #[test]
    fn expiry_check() {
        let mut r = row(&"00".repeat(12), &"11".repeat(16), "00");
        let now = Utc::now();
        assert!(!r.is_expired(now));
        r.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(r.is_expired(now));
        r.expires_at = Some(now + chrono::Duration::seconds(60));
        assert!(!r.is_expired(now));
    }
}
