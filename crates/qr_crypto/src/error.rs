use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid public key size: expected {expected} bytes, got {got}")]
    InvalidKeySize { expected: usize, got: usize },

    #[error("Invalid KEM ciphertext size: expected {expected} bytes, got {got}")]
    InvalidCiphertextSize { expected: usize, got: usize },

    #[error("Invalid key length: AES-256-GCM requires 32 bytes, got {got}")]
    InvalidKeyLength { got: usize },

    #[error("AEAD encryption failed")]
    AeadEncrypt,

    #[error("AEAD decryption failed (authentication tag mismatch, possible tampering)")]
    AuthenticationFailure,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
