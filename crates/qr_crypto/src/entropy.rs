//! Quantum entropy acquisition with local CSPRNG fallback.
//!
//! The primary source is a remote quantum random number service returning
//! uint8 arrays as JSON. Any failure on that path (transport error, timeout,
//! malformed body, wrong length) silently degrades to the OS CSPRNG, so
//! `get_bytes` never fails and never returns a wrong-length result.

use std::time::Duration;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use zeroize::Zeroizing;

/// Public ANU QRNG endpoint. Override per deployment via config.
pub const DEFAULT_ENTROPY_URL: &str = "https://qrng.anu.edu.au/API/jsonI.php";

const FETCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Which generator actually produced the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyOrigin {
    /// Bytes came from the remote quantum service.
    Quantum,
    /// Remote fetch failed or was disabled; OS CSPRNG used instead.
    LocalFallback,
}

/// Random bytes plus provenance. Never persisted.
pub struct EntropyBytes {
    pub bytes: Zeroizing<Vec<u8>>,
    pub origin: EntropyOrigin,
}

#[derive(Deserialize)]
struct QrngResponse {
    data: Vec<u8>,
    #[serde(default)]
    success: bool,
}

/// Handle to the entropy service. Cheap to clone.
#[derive(Clone)]
pub struct EntropySource {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl EntropySource {
    /// Source backed by a remote service at `endpoint`, with the local
    /// CSPRNG as fallback.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = match reqwest::Client::builder().timeout(FETCH_TIMEOUT).build() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    target: "qr_crypto",
                    event = "entropy_client_build_failed",
                    error = %e
                );
                // Degrade to local-only rather than surfacing the error.
                return Self { endpoint: None, client: reqwest::Client::new() };
            }
        };
        Self { endpoint: Some(endpoint.into()), client }
    }

    /// Source that never touches the network (tests, air-gapped hosts).
    pub fn local_only() -> Self {
        Self { endpoint: None, client: reqwest::Client::new() }
    }

    /// Fetch exactly `length` random bytes. Infallible: degraded paths fall
    /// back to the OS CSPRNG.
    pub async fn get_bytes(&self, length: usize) -> EntropyBytes {
        if let Some(endpoint) = &self.endpoint {
            if let Some(bytes) = self.fetch_remote(endpoint, length).await {
                return EntropyBytes { bytes: Zeroizing::new(bytes), origin: EntropyOrigin::Quantum };
            }
        }
        let mut bytes = Zeroizing::new(vec![0u8; length]);
        OsRng.fill_bytes(&mut bytes);
        EntropyBytes { bytes, origin: EntropyOrigin::LocalFallback }
    }

    async fn fetch_remote(&self, endpoint: &str, length: usize) -> Option<Vec<u8>> {
        let result = self
            .client
            .get(endpoint)
            .query(&[("length", length.to_string()), ("type", "uint8".to_string())])
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(
                    target: "qr_crypto",
                    event = "entropy_fetch_failed",
                    error = %e
                );
                return None;
            }
        };

        let parsed: QrngResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    target: "qr_crypto",
                    event = "entropy_parse_failed",
                    error = %e
                );
                return None;
            }
        };

        if !parsed.success || parsed.data.len() != length {
            tracing::warn!(
                target: "qr_crypto",
                event = "entropy_bad_response",
                requested = length,
                received = parsed.data.len(),
                success = parsed.success
            );
            return None;
        }

        Some(parsed.data)
    }
}
