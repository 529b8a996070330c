//! Authenticated encryption: AES-256-GCM with explicit parts.
//!
//! Key: 32 bytes. IV: 12 bytes, freshly random per call (IV reuse under the
//! same key is a correctness violation). Tag: 16 bytes, split out of the
//! combined AEAD output so the store can persist iv / tag / ciphertext as
//! separate columns.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng},
    Aes256Gcm, Nonce,
};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// IV size in bytes (96-bit GCM standard).
pub const IV_LEN: usize = 12;
/// Authentication tag size in bytes.
pub const TAG_LEN: usize = 16;
/// Key size in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Ciphertext with its IV and tag held separately.
#[derive(Debug, Clone)]
pub struct EncryptedData {
    pub iv: [u8; IV_LEN],
    pub auth_tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under a 32-byte key with a fresh random IV.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<EncryptedData, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyLength { got: key.len() });
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AeadEncrypt)?;

    let nonce = Aes256Gcm::generate_nonce(&mut AeadOsRng);

    // aes-gcm appends the 16-byte tag to the ciphertext; split it back out.
    let mut combined = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::AeadEncrypt)?;
    let tag_start = combined.len() - TAG_LEN;
    let tag_bytes = combined.split_off(tag_start);

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&nonce);
    let mut auth_tag = [0u8; TAG_LEN];
    auth_tag.copy_from_slice(&tag_bytes);

    Ok(EncryptedData { iv, auth_tag, ciphertext: combined })
}

/// Decrypt and verify. On tag mismatch (tampering, wrong key, wrong IV)
/// returns `AuthenticationFailure` and never any partial plaintext.
pub fn decrypt(data: &EncryptedData, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyLength { got: key.len() });
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AuthenticationFailure)?;

    let mut combined = Vec::with_capacity(data.ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(&data.ciphertext);
    combined.extend_from_slice(&data.auth_tag);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&data.iv), combined.as_slice())
        .map_err(|_| CryptoError::AuthenticationFailure)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let data = encrypt(b"attack at dawn", &KEY).expect("encrypt");
        let plaintext = decrypt(&data, &KEY).expect("decrypt");
        assert_eq!(&*plaintext, b"attack at dawn");
    }

    #[test]
    fn fresh_iv_per_call() {
        let a = encrypt(b"same plaintext", &KEY).expect("encrypt");
        let b = encrypt(b"same plaintext", &KEY).expect("encrypt");
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn rejects_short_key() {
        let err = encrypt(b"x", &[0u8; 16]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyLength { got: 16 }));
    }

    #[test]
    fn flipped_ciphertext_bit_fails_auth() {
        let mut data = encrypt(b"integrity matters", &KEY).expect("encrypt");
        data.ciphertext[0] ^= 0x01;
        let err = decrypt(&data, &KEY).unwrap_err();
        assert!(matches!(err, CryptoError::AuthenticationFailure));
    }

    #[test]
    fn flipped_tag_bit_fails_auth() {
        let mut data = encrypt(b"integrity matters", &KEY).expect("encrypt");
        data.auth_tag[15] ^= 0x80;
        let err = decrypt(&data, &KEY).unwrap_err();
        assert!(matches!(err, CryptoError::AuthenticationFailure));
    }

    #[test]
    fn wrong_key_fails_auth() {
        let data = encrypt(b"secret", &KEY).expect("encrypt");
        let err = decrypt(&data, &[0x43; 32]).unwrap_err();
        assert!(matches!(err, CryptoError::AuthenticationFailure));
    }

    #[test]
    fn wrong_iv_fails_auth() {
        let mut data = encrypt(b"secret", &KEY).expect("encrypt");
        data.iv[0] ^= 0xff;
        let err = decrypt(&data, &KEY).unwrap_err();
        assert!(matches!(err, CryptoError::AuthenticationFailure));
    }
}
