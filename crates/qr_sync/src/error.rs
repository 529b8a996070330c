use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Store request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Store rejected request ({status}): {body}")]
    StoreStatus { status: u16, body: String },

    #[error(transparent)]
    Service(#[from] qr_relay::ServiceError),
}
