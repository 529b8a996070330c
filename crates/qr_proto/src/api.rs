//! API request/response types for the encryption-service boundary.
//! These map directly to JSON bodies on the wire.
//!
//! Request fields are `Option` so the handler can report a missing field
//! by name, distinctly from a decryption failure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct SealRequest {
    pub message: Option<String>,
    pub sender_id: Option<String>,
    /// Exactly one of `receiver_id` / `group_id` routes the message.
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SealResponse {
    /// 12-byte IV, hex.
    pub iv: String,
    /// 16-byte authentication tag, hex.
    pub auth_tag: String,
    /// Ciphertext, hex.
    pub ciphertext: String,
    /// KEM encapsulation ciphertext, hex. HKDF strategy only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kem_ciphertext: Option<String>,
    /// HKDF salt, hex. HKDF strategy only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenRequest {
    pub ciphertext: Option<String>,
    pub iv: Option<String>,
    pub auth_tag: Option<String>,
    pub sender_id: Option<String>,
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub kem_ciphertext: Option<String>,
    #[serde(default)]
    pub salt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenResponse {
    pub plaintext: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
