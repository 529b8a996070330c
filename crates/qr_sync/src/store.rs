//! Remote store abstraction.
//!
//! The managed store is opaque transport: rows in, filtered rows out,
//! delete by id list. `RelayStore` keeps the engine independent of the
//! concrete backend so a real subscription transport can replace polling
//! later without touching the merge/dedup/purge logic.

use async_trait::async_trait;
use tokio::sync::Mutex;

use qr_proto::EnvelopeRow;

use crate::error::SyncError;

#[async_trait]
pub trait RelayStore: Send + Sync {
    /// Persist one envelope row.
    async fn insert(&self, row: EnvelopeRow) -> Result<(), SyncError>;

    /// All rows matching `receiver_id = identity OR sender_id = identity
    /// OR group_id IN groups`. Refetches the full addressed set every
    /// cycle; there is no cursor.
    async fn fetch_addressed(
        &self,
        identity: &str,
        groups: &[String],
    ) -> Result<Vec<EnvelopeRow>, SyncError>;

    /// Delete rows by id. Ids not present are ignored.
    async fn delete_by_ids(&self, ids: &[String]) -> Result<(), SyncError>;
}

// ── REST backend ─────────────────────────────────────────────────────────────

/// Connection settings for the managed store's REST API.
#[derive(Clone)]
pub struct StoreConfig {
    /// Base URL, e.g. `https://project.example.co`.
    pub base_url: String,
    /// API key, sent as both `apikey` and bearer token.
    pub api_key: String,
}

impl StoreConfig {
    /// Read `QRELAY_STORE_URL` / `QRELAY_STORE_KEY` from the environment.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("QRELAY_STORE_URL").ok()?;
        let api_key = std::env::var("QRELAY_STORE_KEY").ok()?;
        Some(Self { base_url, api_key })
    }
}

/// REST client for the managed store (PostgREST-style filter syntax).
pub struct RestStore {
    config: StoreConfig,
    // TODO: give store calls a request timeout; the entropy fetch has one,
    // these do not, so a hung store stalls the issuing cycle.
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    fn envelopes_url(&self) -> String {
        format!("{}/rest/v1/envelopes", self.config.base_url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::StoreStatus { status: status.as_u16(), body })
    }
}

#[async_trait]
impl RelayStore for RestStore {
    async fn insert(&self, row: EnvelopeRow) -> Result<(), SyncError> {
        let response = self
            .authed(self.client.post(self.envelopes_url()))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_addressed(
        &self,
        identity: &str,
        groups: &[String],
    ) -> Result<Vec<EnvelopeRow>, SyncError> {
        let filter = addressed_filter(identity, groups);
        let response = self
            .authed(self.client.get(self.envelopes_url()))
            .query(&[("select", "*"), ("or", filter.as_str())])
            .send()
            .await?;
        let rows = Self::check(response).await?.json::<Vec<EnvelopeRow>>().await?;
        Ok(rows)
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<(), SyncError> {
        if ids.is_empty() {
            return Ok(());
        }
        let filter = format!("in.({})", ids.join(","));
        let response = self
            .authed(self.client.delete(self.envelopes_url()))
            .query(&[("id", filter.as_str())])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// PostgREST `or` filter for the addressed set:
/// `receiver_id = me OR sender_id = me OR group_id IN groups`.
fn addressed_filter(identity: &str, groups: &[String]) -> String {
    if groups.is_empty() {
        format!("(receiver_id.eq.{identity},sender_id.eq.{identity})")
    } else {
        format!(
            "(receiver_id.eq.{identity},sender_id.eq.{identity},group_id.in.({}))",
            groups.join(",")
        )
    }
}

// ── In-memory backend ────────────────────────────────────────────────────────

/// In-memory store for tests and simulations. Same visible semantics as
/// the REST backend, including no cross-row transactions.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<EnvelopeRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held (test assertions).
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RelayStore for MemoryStore {
    async fn insert(&self, row: EnvelopeRow) -> Result<(), SyncError> {
        self.rows.lock().await.push(row);
        Ok(())
    }

    async fn fetch_addressed(
        &self,
        identity: &str,
        groups: &[String],
    ) -> Result<Vec<EnvelopeRow>, SyncError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|row| {
                row.receiver_id.as_deref() == Some(identity)
                    || row.sender_id == identity
                    || row.group_id.as_ref().is_some_and(|g| groups.contains(g))
            })
            .cloned()
            .collect())
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<(), SyncError> {
        self.rows.lock().await.retain(|row| !ids.contains(&row.id));
        Ok(())
    }
}
