//! Seal/open orchestration.
//!
//! `seal`: derive a session key per the configured strategy (running the
//! entropy fetch + KEM round for `Hkdf`), AEAD-encrypt, and hand back the
//! envelope parts plus whatever public material (salt, KEM ciphertext) the
//! receiver needs. `open` re-derives with the same strategy and decrypts.
//! Authentication failures surface as a typed result at this boundary,
//! never as a panic or a partial plaintext.

use zeroize::Zeroizing;

use qr_crypto::aead::{self, EncryptedData};
use qr_crypto::entropy::EntropySource;
use qr_crypto::kdf::{self, ContextKeyDeriver, SessionKey};
use qr_crypto::kem::{self, KemKeyPair};
use qr_crypto::{ConversationContext, CryptoError};
use qr_proto::api::{OpenRequest, OpenResponse, SealRequest, SealResponse};
use qr_proto::envelope;

use crate::config::{KeyStrategy, RelayConfig};
use crate::error::ServiceError;

/// Salt length for the HKDF strategy (drawn from the entropy source).
const HKDF_SALT_LEN: usize = 32;

/// Output of `seal`: AEAD parts plus the public material the receiver
/// needs to re-derive the key (HKDF strategy only).
pub struct SealedMessage {
    pub data: EncryptedData,
    pub kem_ciphertext: Option<Vec<u8>>,
    pub salt: Option<Vec<u8>>,
}

pub struct RelayEncryptionService {
    strategy: KeyStrategy,
    deriver: ContextKeyDeriver,
    entropy: EntropySource,
    /// Local KEM key pair, generated per process and never persisted.
    /// Stands in for a peer key directory: seal encapsulates against this
    /// public key, open decapsulates with the matching private key.
    kem_keys: Option<KemKeyPair>,
}

impl RelayEncryptionService {
    pub fn new(config: RelayConfig) -> Self {
        let entropy = match &config.entropy_url {
            Some(url) => EntropySource::new(url.clone()),
            None => EntropySource::local_only(),
        };
        let kem_keys = match config.strategy {
            KeyStrategy::Hkdf => Some(kem::generate_keypair()),
            KeyStrategy::ContextBound => None,
        };
        Self {
            strategy: config.strategy,
            deriver: ContextKeyDeriver::new(config.master_secret),
            entropy,
            kem_keys,
        }
    }

    pub fn strategy(&self) -> KeyStrategy {
        self.strategy
    }

    /// Encrypt `plaintext` for `context`.
    pub async fn seal(
        &self,
        plaintext: &[u8],
        context: &ConversationContext,
    ) -> Result<SealedMessage, ServiceError> {
        match self.strategy {
            KeyStrategy::ContextBound => {
                let key = self.deriver.derive(context)?;
                let data = aead::encrypt(plaintext, &key.0)?;
                Ok(SealedMessage { data, kem_ciphertext: None, salt: None })
            }
            KeyStrategy::Hkdf => {
                let salt = self.entropy.get_bytes(HKDF_SALT_LEN).await;
                let kem_keys = self.kem_keys.as_ref().ok_or(ServiceError::MissingField("kem keypair"))?;
                let encapsulated = kem::encapsulate(&kem_keys.public_key)?;

                let key = kdf::derive_session_key(
                    &encapsulated.shared_secret.0,
                    &salt.bytes,
                    context.canonical().as_bytes(),
                )?;
                let data = aead::encrypt(plaintext, &key.0)?;

                tracing::debug!(
                    target: "qr_relay",
                    event = "seal_kem_round",
                    entropy_origin = ?salt.origin,
                    context = %context
                );

                Ok(SealedMessage {
                    data,
                    kem_ciphertext: Some(encapsulated.ciphertext),
                    salt: Some(salt.bytes.to_vec()),
                })
            }
        }
    }

    /// Re-derive the session key for `context` and decrypt.
    ///
    /// Idempotent: identical (envelope, context, key material) inputs give
    /// identical results.
    pub fn open(
        &self,
        data: &EncryptedData,
        context: &ConversationContext,
        kem_ciphertext: Option<&[u8]>,
        salt: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>, ServiceError> {
        let key = self.rederive_key(context, kem_ciphertext, salt)?;
        match aead::decrypt(data, &key.0) {
            Ok(plaintext) => Ok(plaintext),
            Err(CryptoError::AuthenticationFailure) => {
                tracing::warn!(
                    target: "qr_relay",
                    event = "open_auth_failure",
                    context = %context
                );
                Err(ServiceError::Decryption)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn rederive_key(
        &self,
        context: &ConversationContext,
        kem_ciphertext: Option<&[u8]>,
        salt: Option<&[u8]>,
    ) -> Result<SessionKey, ServiceError> {
        match self.strategy {
            KeyStrategy::ContextBound => Ok(self.deriver.derive(context)?),
            KeyStrategy::Hkdf => {
                let kem_ct = kem_ciphertext.ok_or(ServiceError::MissingField("kem_ciphertext"))?;
                let salt = salt.ok_or(ServiceError::MissingField("salt"))?;
                let kem_keys = self.kem_keys.as_ref().ok_or(ServiceError::MissingField("kem keypair"))?;
                let candidate = kem::decapsulate(kem_ct, kem_keys.private_key())?;
                Ok(kdf::derive_session_key(
                    &candidate.0,
                    salt,
                    context.canonical().as_bytes(),
                )?)
            }
        }
    }

    /// `open` + UTF-8 decode, for callers that sealed text.
    pub fn open_text(
        &self,
        data: &EncryptedData,
        context: &ConversationContext,
        kem_ciphertext: Option<&[u8]>,
        salt: Option<&[u8]>,
    ) -> Result<String, ServiceError> {
        let plaintext = self.open(data, context, kem_ciphertext, salt)?;
        String::from_utf8(plaintext.to_vec()).map_err(|_| ServiceError::InvalidPlaintext)
    }

    // ── Request/response boundary ────────────────────────────────────────

    pub async fn handle_seal(&self, request: SealRequest) -> Result<SealResponse, ServiceError> {
        let message = request.message.as_deref().ok_or(ServiceError::MissingField("message"))?;
        let sender_id = request.sender_id.as_deref().ok_or(ServiceError::MissingField("sender_id"))?;
        let context = ConversationContext::from_routing(
            sender_id,
            request.receiver_id.as_deref(),
            request.group_id.as_deref(),
        )
        .ok_or(ServiceError::MissingField("receiver_id or group_id"))?;

        let sealed = self.seal(message.as_bytes(), &context).await?;
        Ok(SealResponse {
            iv: hex::encode(sealed.data.iv),
            auth_tag: hex::encode(sealed.data.auth_tag),
            ciphertext: hex::encode(&sealed.data.ciphertext),
            kem_ciphertext: sealed.kem_ciphertext.map(hex::encode),
            salt: sealed.salt.map(hex::encode),
        })
    }

    pub fn handle_open(&self, request: OpenRequest) -> Result<OpenResponse, ServiceError> {
        let ciphertext = request.ciphertext.as_deref().ok_or(ServiceError::MissingField("ciphertext"))?;
        let iv = request.iv.as_deref().ok_or(ServiceError::MissingField("iv"))?;
        let auth_tag = request.auth_tag.as_deref().ok_or(ServiceError::MissingField("auth_tag"))?;
        let sender_id = request.sender_id.as_deref().ok_or(ServiceError::MissingField("sender_id"))?;
        let context = ConversationContext::from_routing(
            sender_id,
            request.receiver_id.as_deref(),
            request.group_id.as_deref(),
        )
        .ok_or(ServiceError::MissingField("receiver_id or group_id"))?;

        let data = envelope::decode_parts(iv, auth_tag, ciphertext).map_err(ServiceError::Crypto)?;
        let kem_ciphertext = request
            .kem_ciphertext
            .as_deref()
            .map(hex::decode)
            .transpose()
            .map_err(CryptoError::from)?;
        let salt = request
            .salt
            .as_deref()
            .map(hex::decode)
            .transpose()
            .map_err(CryptoError::from)?;

        let plaintext = self.open_text(&data, &context, kem_ciphertext.as_deref(), salt.as_deref())?;
        Ok(OpenResponse { plaintext })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qr_crypto::MasterSecret;

    fn shared_secret_service() -> RelayEncryptionService {
        RelayEncryptionService::new(RelayConfig::for_tests(MasterSecret::from_bytes([9u8; 32])))
    }

    fn hkdf_service() -> RelayEncryptionService {
        RelayEncryptionService::new(RelayConfig {
            strategy: KeyStrategy::Hkdf,
            master_secret: MasterSecret::from_bytes([9u8; 32]),
            entropy_url: None,
        })
    }

    #[tokio::test]
    async fn alice_seals_bob_opens() {
        let master = MasterSecret::from_bytes([1u8; 32]);
        let alice = RelayEncryptionService::new(RelayConfig::for_tests(master.clone()));
        let bob = RelayEncryptionService::new(RelayConfig::for_tests(master));

        let context = ConversationContext::direct("alice", "bob");
        let sealed = alice.seal(b"RENDEZVOUS AT DAWN", &context).await.expect("seal");

        let plaintext = bob
            .open_text(&sealed.data, &context, None, None)
            .expect("open");
        assert_eq!(plaintext, "RENDEZVOUS AT DAWN");

        // Same envelope under a different conversation must not open.
        let wrong = ConversationContext::direct("alice", "carol");
        let err = bob.open(&sealed.data, &wrong, None, None).unwrap_err();
        assert!(matches!(err, ServiceError::Decryption));
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let service = shared_secret_service();
        let context = ConversationContext::group("ops-room");
        let sealed = service.seal(b"stand by", &context).await.expect("seal");

        let a = service.open(&sealed.data, &context, None, None).expect("open");
        let b = service.open(&sealed.data, &context, None, None).expect("open");
        assert_eq!(*a, *b);
    }

    #[tokio::test]
    async fn hkdf_seal_emits_public_material() {
        let service = hkdf_service();
        let context = ConversationContext::direct("alice", "bob");
        let sealed = service.seal(b"hello", &context).await.expect("seal");

        assert_eq!(sealed.salt.as_ref().map(Vec::len), Some(HKDF_SALT_LEN));
        assert_eq!(
            sealed.kem_ciphertext.as_ref().map(Vec::len),
            Some(qr_crypto::kem::sizes::CIPHERTEXT)
        );
    }

    #[tokio::test]
    async fn hkdf_open_cannot_authenticate_with_simulated_kem() {
        // The simulated KEM's decapsulated candidate never equals the
        // sealed secret, so the HKDF strategy must fail closed with the
        // typed decryption error (not garbage plaintext).
        let service = hkdf_service();
        let context = ConversationContext::direct("alice", "bob");
        let sealed = service.seal(b"hello", &context).await.expect("seal");

        let err = service
            .open(
                &sealed.data,
                &context,
                sealed.kem_ciphertext.as_deref(),
                sealed.salt.as_deref(),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Decryption));
    }

    #[tokio::test]
    async fn hkdf_open_requires_transmitted_material() {
        let service = hkdf_service();
        let context = ConversationContext::direct("alice", "bob");
        let sealed = service.seal(b"hello", &context).await.expect("seal");

        let err = service.open(&sealed.data, &context, None, sealed.salt.as_deref()).unwrap_err();
        assert!(matches!(err, ServiceError::MissingField("kem_ciphertext")));

        let err = service
            .open(&sealed.data, &context, sealed.kem_ciphertext.as_deref(), None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingField("salt")));
    }

    #[tokio::test]
    async fn handle_seal_reports_missing_fields_by_name() {
        let service = shared_secret_service();

        let err = service
            .handle_seal(qr_proto::api::SealRequest {
                message: None,
                sender_id: Some("alice".into()),
                receiver_id: Some("bob".into()),
                group_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: message");

        let err = service
            .handle_seal(qr_proto::api::SealRequest {
                message: Some("hi".into()),
                sender_id: Some("alice".into()),
                receiver_id: None,
                group_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: receiver_id or group_id");
    }

    #[tokio::test]
    async fn handle_open_roundtrip_and_distinct_errors() {
        let service = shared_secret_service();
        let sealed = service
            .handle_seal(qr_proto::api::SealRequest {
                message: Some("over the wire".into()),
                sender_id: Some("alice".into()),
                receiver_id: Some("bob".into()),
                group_id: None,
            })
            .await
            .expect("seal");

        let opened = service
            .handle_open(qr_proto::api::OpenRequest {
                ciphertext: Some(sealed.ciphertext.clone()),
                iv: Some(sealed.iv.clone()),
                auth_tag: Some(sealed.auth_tag.clone()),
                sender_id: Some("alice".into()),
                receiver_id: Some("bob".into()),
                group_id: None,
                kem_ciphertext: None,
                salt: None,
            })
            .expect("open");
        assert_eq!(opened.plaintext, "over the wire");

        // Tampered tag: decryption failure, textually distinct from the
        // missing-field error.
        let mut tag = hex::decode(&sealed.auth_tag).expect("hex");
        tag[0] ^= 0x01;
        let err = service
            .handle_open(qr_proto::api::OpenRequest {
                ciphertext: Some(sealed.ciphertext),
                iv: Some(sealed.iv),
                auth_tag: Some(hex::encode(tag)),
                sender_id: Some("alice".into()),
                receiver_id: Some("bob".into()),
                group_id: None,
                kem_ciphertext: None,
                salt: None,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Decryption failed: authentication tag mismatch");
    }
}
