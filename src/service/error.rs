use thiserror::Error;
use uuid::Uuid;
use axum::http::StatusCode;

use crate::{db::StoreError, error::HttpError};

/// Unexpected failures. Expected business outcomes are returned as values, never as this type.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("no unique referral code found after {0} attempts")]
    CodeGenerationExhausted(u32),

    #[error("referral code for user {0} conflicted on insert but could not be re-read")]
    CodeReconcileFailed(Uuid),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Store(StoreError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        tracing::error!("entitlement service failure: {}", error);
        HttpError::new(error.to_string(), error.status_code())
    }
}
