use crate::admission::AdmissionError;
use crate::order_actor::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;

/// HTTP-facing error: a status, a stable code and a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AdmissionError> for ApiError {
    fn from(e: AdmissionError) -> Self {
        use StatusCode as S;
        let (status, code) = match &e {
            AdmissionError::ProductNotFound(_) => (S::NOT_FOUND, "PRODUCT_NOT_FOUND"),
            AdmissionError::OrderNotFound(_) => (S::NOT_FOUND, "ORDER_NOT_FOUND"),
            AdmissionError::ProductUnavailable(_) => (S::CONFLICT, "PRODUCT_UNAVAILABLE"),
            AdmissionError::InvalidRequest(_) => (S::BAD_REQUEST, "BAD_REQUEST"),
            AdmissionError::ValidationTimeout(_) => (S::GATEWAY_TIMEOUT, "VALIDATION_TIMEOUT"),
            AdmissionError::Store(StoreError::Timeout(_)) => (S::GATEWAY_TIMEOUT, "STORE_TIMEOUT"),
            AdmissionError::ServiceOverloaded(_) => (S::SERVICE_UNAVAILABLE, "SERVICE_OVERLOADED"),
            AdmissionError::Cancelled => (S::SERVICE_UNAVAILABLE, "CANCELLED"),
            AdmissionError::Validation(_) => (S::INTERNAL_SERVER_ERROR, "VALIDATION_FAILED"),
            AdmissionError::PersistenceFailure(_) => {
                (S::INTERNAL_SERVER_ERROR, "PERSISTENCE_FAILURE")
            }
            AdmissionError::Store(_) => (S::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
        };
        Self::new(status, code, e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                "Request failed"
            );
        }
        let body = ErrorBody {
            error: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
