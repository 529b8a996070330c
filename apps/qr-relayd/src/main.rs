//! qr-relayd — HTTP entry for the Quantum Relay encryption service.
//!
//! Two JSON endpoints mirror the service boundary: `POST /seal` encrypts a
//! message for a conversation, `POST /open` re-derives the key and
//! decrypts. Missing-field and decryption errors come back as distinct
//! `{"error": ...}` messages.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use qr_proto::api::{ErrorResponse, OpenRequest, OpenResponse, SealRequest, SealResponse};
use qr_relay::{RelayConfig, RelayEncryptionService, ServiceError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qr_relayd=info,qr_relay=info,qr_crypto=info".into()),
        )
        .init();

    let config = RelayConfig::from_env()?;
    let service = Arc::new(RelayEncryptionService::new(config));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/seal", post(seal))
        .route("/open", post(open))
        .with_state(service);

    let bind_addr =
        std::env::var("QRELAY_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8787".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(target: "qr_relayd", event = "listening", addr = %bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn seal(
    State(service): State<Arc<RelayEncryptionService>>,
    Json(request): Json<SealRequest>,
) -> Result<Json<SealResponse>, (StatusCode, Json<ErrorResponse>)> {
    service.handle_seal(request).await.map(Json).map_err(to_http)
}

async fn open(
    State(service): State<Arc<RelayEncryptionService>>,
    Json(request): Json<OpenRequest>,
) -> Result<Json<OpenResponse>, (StatusCode, Json<ErrorResponse>)> {
    service.handle_open(request).map(Json).map_err(to_http)
}

fn to_http(error: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match error {
        ServiceError::MissingField(_) => StatusCode::BAD_REQUEST,
        ServiceError::Decryption | ServiceError::InvalidPlaintext => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Crypto(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(ErrorResponse { error: error.to_string() }))
}
