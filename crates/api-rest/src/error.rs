use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use frontdesk_core::DeskError;
use uuid::Uuid;

use crate::dto::{error_kind, ErrorRes};
use crate::state::status_for;

/// Errors surfaced by REST handlers.
///
/// Every failure is turned into a JSON body for the operator; none of them stops the server.
#[derive(Debug)]
pub enum ApiError {
    Desk(DeskError),
    UnknownSession(Uuid),
    BadSessionId(String),
    Internal(String),
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<DeskError> for ApiError {
    fn from(e: DeskError) -> Self {
        Self::Desk(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            Self::Desk(e) => {
                tracing::error!("Request failed: {:?}", e);
                (status_for(e), error_kind(e), e.user_message())
            }
            Self::UnknownSession(id) => (
                StatusCode::NOT_FOUND,
                "unknown_session",
                format!("no session {id}"),
            ),
            Self::BadSessionId(raw) => (
                StatusCode::BAD_REQUEST,
                "invalid_session_id",
                format!("invalid session id: {raw}"),
            ),
            Self::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorRes {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}
