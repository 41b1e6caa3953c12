use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

use nutrisaur_types::api::ApiResponse;

/// Every failure a handler can return.
///
/// Input problems keep HTTP 200 with `success: false` so existing dashboard
/// scripts can show the message. Storage failures are logged here and the
/// client only gets a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Not logged in")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("Database error")]
    Database(#[source] anyhow::Error),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::OK,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        Self::validation("Invalid JSON data")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Database(e) = &self {
            error!("Database error: {:#}", e);
        }

        let status = self.status();
        (status, Json(ApiResponse::failure(self.to_string()))).into_response()
    }
}
