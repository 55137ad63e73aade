use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use powchain_core::LedgerError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("proof search task failed: {0}")]
    Search(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Ledger(LedgerError::Validation(msg.into()))
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Ledger(LedgerError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Ledger(LedgerError::PeerUnreachable { .. }) => StatusCode::BAD_GATEWAY,
            Self::Ledger(LedgerError::InvalidChain(_) | LedgerError::InvalidProof { .. }) => {
                StatusCode::CONFLICT
            }
            Self::Ledger(LedgerError::EmptyChain | LedgerError::Storage(_)) | Self::Search(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
