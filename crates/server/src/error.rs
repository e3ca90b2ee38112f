use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cohort_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error_class: &'static str,
    pub message: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

/// An application failure rendered as an HTTP status and JSON body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(error: ApplicationError, correlation_id: impl Into<String>) -> Self {
        let error_class = error.error_class();
        let interface = error.into_interface(correlation_id);
        let (status, detail) = match &interface {
            InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message),
            InterfaceError::ServiceUnavailable { message, .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, message)
            }
            InterfaceError::Internal { message, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        Self {
            status,
            body: ErrorBody {
                error_class,
                message: interface.user_message(),
                detail: detail.clone(),
                correlation_id: interface.correlation_id().to_string(),
            },
        }
    }

    pub fn invalid_query(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::new(ApplicationError::InvalidQuery(message.into()), correlation_id)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(
            event_name = "system.server.request_failed",
            status = self.status.as_u16(),
            error_class = self.body.error_class,
            correlation_id = %self.body.correlation_id,
            detail = %self.body.detail,
            "request failed"
        );
        (self.status, Json(self.body)).into_response()
    }
}
