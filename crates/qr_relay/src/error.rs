use thiserror::Error;

use qr_crypto::CryptoError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Decryption failed: authentication tag mismatch")]
    Decryption,

    #[error("Decrypted payload is not valid UTF-8")]
    InvalidPlaintext,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
