//! Canonical conversation identity.
//!
//! Direct chats canonicalize to `P2P:{lo}:{hi}` with the participant pair
//! sorted, so (A, B) and (B, A) derive the same key. Groups canonicalize to
//! `GRP:{id}`. The tag prefixes keep the two namespaces textually disjoint
//! even for adversarially chosen ids.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationContext {
    /// Two-party chat; participants stored sorted.
    Direct { lo: String, hi: String },
    /// Group chat keyed by group id.
    Group { id: String },
}

impl ConversationContext {
    /// Direct-chat context; the pair is sorted so argument order is
    /// irrelevant.
    pub fn direct(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self::Direct { lo: a, hi: b }
        } else {
            Self::Direct { lo: b, hi: a }
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self::Group { id: id.into() }
    }

    /// Build from routing metadata: a group id wins over a receiver id.
    pub fn from_routing(sender_id: &str, receiver_id: Option<&str>, group_id: Option<&str>) -> Option<Self> {
        match (group_id, receiver_id) {
            (Some(group), _) => Some(Self::group(group)),
            (None, Some(receiver)) => Some(Self::direct(sender_id, receiver)),
            (None, None) => None,
        }
    }

    /// The canonical string fed into key derivation.
    pub fn canonical(&self) -> String {
        match self {
            Self::Direct { lo, hi } => format!("P2P:{lo}:{hi}"),
            Self::Group { id } => format!("GRP:{id}"),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }
}

impl fmt::Display for ConversationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
