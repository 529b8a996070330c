//! Client-local message record — the unit of the decrypted log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of processing one envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    Text {
        body: String,
    },
    /// Decryption failed; the record stays visible rather than vanishing.
    DecryptFailed {
        reason: String,
    },
}

/// One entry in the local log. Immutable once inserted; the log is rebuilt
/// from empty at every process start and grown per poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Envelope id (dedup key) for received rows, fresh UUID for
    /// optimistic local sends.
    pub id: String,
    pub sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn text(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: Option<String>,
        group_id: Option<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            receiver_id,
            group_id,
            body: MessageBody::Text { body: body.into() },
            created_at,
        }
    }

    /// Visible failure sentinel for an envelope that did not decrypt.
    pub fn decrypt_failed(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: Option<String>,
        group_id: Option<String>,
        reason: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            receiver_id,
            group_id,
            body: MessageBody::DecryptFailed { reason: reason.into() },
            created_at,
        }
    }
}
