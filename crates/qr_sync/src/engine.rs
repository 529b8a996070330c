//! The sync engine: fetch, process, purge.
//!
//! Each identity runs one engine. A fixed-interval timer fires cycles;
//! cycles are NOT chained from completion, so a run that outlives the
//! interval can overlap the next one. That contention is accepted, not
//! auto-corrected: the log dedups by id, so the worst case is redundant
//! work.
//!
//! Crash-safety bias: the store offers no transaction spanning fetch and
//! delete. Rows are deleted only after the local append (including the
//! failure-sentinel case) succeeded, so a crash in between causes
//! redelivery, never loss.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use qr_crypto::{sign, ConversationContext};
use qr_proto::{EnvelopeRow, MessageBody, MessageRecord};
use qr_relay::RelayEncryptionService;

use crate::error::SyncError;
use crate::log::MessageLog;
use crate::store::RelayStore;

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default envelope retention hint (24h).
pub const DEFAULT_ENVELOPE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct SyncConfig {
    /// The local user id.
    pub identity: String,
    /// Group ids the local identity belongs to.
    pub groups: Vec<String>,
    pub poll_interval: Duration,
    /// `expires_at = created_at + ttl` on outgoing envelopes; `None` sends
    /// without expiry.
    pub envelope_ttl: Option<Duration>,
}

impl SyncConfig {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            groups: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            envelope_ttl: Some(DEFAULT_ENVELOPE_TTL),
        }
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleStats {
    pub fetched: usize,
    pub appended: usize,
    /// Envelopes that produced a failure sentinel instead of plaintext.
    pub failed: usize,
    pub purged: usize,
    /// True when the session generation changed mid-cycle and the results
    /// were discarded.
    pub discarded_stale: bool,
}

pub struct SyncEngine {
    config: SyncConfig,
    store: Arc<dyn RelayStore>,
    service: Arc<RelayEncryptionService>,
    log: Mutex<MessageLog>,
    /// Bumped on logout/teardown. A cycle captures the value at start and
    /// discards its results if it changed, so an in-flight fetch can never
    /// write into a stale identity's log.
    generation: AtomicU64,
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn RelayStore>,
        service: Arc<RelayEncryptionService>,
    ) -> Self {
        Self {
            config,
            store,
            service,
            log: Mutex::new(MessageLog::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &str {
        &self.config.identity
    }

    /// Snapshot of the ordered local log.
    pub async fn log_snapshot(&self) -> Vec<MessageRecord> {
        self.log.lock().await.records().to_vec()
    }

    /// Start the poll loop. Each tick spawns an independent cycle, so a
    /// slow cycle does not delay the next tick. Abort the returned handle
    /// (after `shutdown`) to stop polling.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.config.poll_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let engine = Arc::clone(&self);
                tokio::spawn(async move {
                    if let Err(e) = engine.run_cycle().await {
                        // Transient store/network errors; the next tick
                        // retries naturally.
                        tracing::warn!(
                            target: "qr_sync",
                            event = "cycle_error",
                            identity = %engine.config.identity,
                            error = %e
                        );
                    }
                });
            }
        })
    }

    /// End the session: any cycle still in flight discards its results.
    pub fn shutdown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            target: "qr_sync",
            event = "shutdown",
            identity = %self.config.identity
        );
    }

    /// One full fetch → process → purge cycle.
    pub async fn run_cycle(&self) -> Result<CycleStats, SyncError> {
        let generation = self.generation.load(Ordering::SeqCst);
        let mut stats = CycleStats::default();

        tracing::debug!(
            target: "qr_sync",
            event = "fetching",
            identity = %self.config.identity
        );
        let envelopes = self
            .store
            .fetch_addressed(&self.config.identity, &self.config.groups)
            .await?;
        stats.fetched = envelopes.len();

        let known: HashSet<String> = {
            let log = self.log.lock().await;
            envelopes
                .iter()
                .filter(|row| log.contains(&row.id))
                .map(|row| row.id.clone())
                .collect()
        };

        let now = Utc::now();
        let mut fresh = Vec::new();
        let mut purge_ids = Vec::new();
        for row in &envelopes {
            let addressed = self.addressed_to_local(row);
            if known.contains(&row.id) {
                // Appended in an earlier cycle; a failed purge is retried here.
                if addressed {
                    purge_ids.push(row.id.clone());
                }
                continue;
            }
            if row.is_expired(now) {
                if addressed {
                    purge_ids.push(row.id.clone());
                }
                continue;
            }

            let record = self.process_row(row);
            if matches!(record.body, MessageBody::DecryptFailed { .. }) {
                stats.failed += 1;
            }
            fresh.push(record);
            if addressed {
                purge_ids.push(row.id.clone());
            }
        }

        {
            let mut log = self.log.lock().await;
            if self.generation.load(Ordering::SeqCst) != generation {
                tracing::info!(
                    target: "qr_sync",
                    event = "stale_cycle_discarded",
                    identity = %self.config.identity,
                    fetched = stats.fetched
                );
                stats.discarded_stale = true;
                return Ok(stats);
            }
            stats.appended = log.merge(fresh);
        }

        // Purge strictly after the local append succeeded. Each envelope is
        // retrievable at most once; a crash before this point redelivers.
        if !purge_ids.is_empty() {
            self.store.delete_by_ids(&purge_ids).await?;
            stats.purged = purge_ids.len();
            tracing::info!(
                target: "qr_sync",
                event = "purged",
                identity = %self.config.identity,
                count = stats.purged
            );
        }

        Ok(stats)
    }

    /// Seal and persist an outgoing message, then append it optimistically
    /// to the local log.
    pub async fn send_message(
        &self,
        body: &str,
        context: &ConversationContext,
    ) -> Result<MessageRecord, SyncError> {
        let sealed = self.service.seal(body.as_bytes(), context).await?;
        let created_at = Utc::now();

        let (receiver_id, group_id) = match context {
            ConversationContext::Direct { lo, hi } => {
                let peer = if lo == &self.config.identity { hi } else { lo };
                (Some(peer.clone()), None)
            }
            ConversationContext::Group { id } => (None, Some(id.clone())),
        };

        let row = EnvelopeRow {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: self.config.identity.clone(),
            receiver_id: receiver_id.clone(),
            group_id: group_id.clone(),
            content: hex::encode(&sealed.data.ciphertext),
            iv: hex::encode(sealed.data.iv),
            auth_tag: hex::encode(sealed.data.auth_tag),
            kem_ciphertext: sealed.kem_ciphertext.map(hex::encode),
            salt: sealed.salt.map(hex::encode),
            signature: sign::simulated_dilithium_tag(body),
            created_at,
            expires_at: self
                .config
                .envelope_ttl
                .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
                .map(|ttl| created_at + ttl),
        };

        tracing::info!(
            target: "qr_sync",
            event = "send",
            identity = %self.config.identity,
            envelope_id = %row.id,
            context = %context
        );
        self.store.insert(row.clone()).await?;

        let record = MessageRecord::text(
            row.id,
            self.config.identity.clone(),
            receiver_id,
            group_id,
            body,
            created_at,
        );
        self.log.lock().await.insert(record.clone());
        Ok(record)
    }

    /// Whether purging this row is the local identity's responsibility:
    /// incoming direct rows, and group rows from other senders. Rows the
    /// local identity sent stay until the peer consumed them.
    fn addressed_to_local(&self, row: &EnvelopeRow) -> bool {
        row.receiver_id.as_deref() == Some(self.config.identity.as_str())
            || (row
                .group_id
                .as_ref()
                .is_some_and(|group| self.config.groups.contains(group))
                && row.sender_id != self.config.identity)
    }

    /// Decrypt one envelope into a log record; failures become a visible
    /// sentinel, never a silent drop.
    fn process_row(&self, row: &EnvelopeRow) -> MessageRecord {
        let sentinel = |reason: String| {
            MessageRecord::decrypt_failed(
                row.id.clone(),
                row.sender_id.clone(),
                row.receiver_id.clone(),
                row.group_id.clone(),
                reason,
                row.created_at,
            )
        };

        let Some(context) = ConversationContext::from_routing(
            &row.sender_id,
            row.receiver_id.as_deref(),
            row.group_id.as_deref(),
        ) else {
            return sentinel("envelope has no routing metadata".into());
        };

        let data = match row.encrypted_data() {
            Ok(data) => data,
            Err(e) => return sentinel(e.to_string()),
        };
        let kem_ciphertext = match row.kem_ciphertext.as_deref().map(hex::decode).transpose() {
            Ok(bytes) => bytes,
            Err(e) => return sentinel(e.to_string()),
        };
        let salt = match row.salt.as_deref().map(hex::decode).transpose() {
            Ok(bytes) => bytes,
            Err(e) => return sentinel(e.to_string()),
        };

        match self.service.open_text(
            &data,
            &context,
            kem_ciphertext.as_deref(),
            salt.as_deref(),
        ) {
            Ok(text) => MessageRecord::text(
                row.id.clone(),
                row.sender_id.clone(),
                row.receiver_id.clone(),
                row.group_id.clone(),
                text,
                row.created_at,
            ),
            Err(e) => {
                tracing::warn!(
                    target: "qr_sync",
                    event = "decrypt_failed",
                    identity = %self.config.identity,
                    envelope_id = %row.id,
                    error = %e
                );
                sentinel(e.to_string())
            }
        }
    }
}
