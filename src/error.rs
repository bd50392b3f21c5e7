// HTTP API Error Types
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::types::{allow_list, Verb};

/// Terminal request error. Every abort in the handler framework ends up here.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed, carries the verbs the endpoint does support
    MethodNotAllowed { message: String, allowed: Vec<Verb> },

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed { .. } => 405,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::MethodNotAllowed { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::MethodNotAllowed { message, allowed } => json!({
                "error": true,
                "message": message,
                "code": self.error_code(),
                "allowed": allowed.iter().map(Verb::as_str).collect::<Vec<_>>(),
            }),
            _ => json!({
                "error": true,
                "message": self.message(),
                "code": self.error_code()
            }),
        }
    }

    /// Comma separated `Allow` header value, only for 405s
    pub fn allow_header(&self) -> Option<String> {
        match self {
            ApiError::MethodNotAllowed { allowed, .. } => Some(
                allowed.iter().map(Verb::as_str).collect::<Vec<_>>().join(", "),
            ),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// 405 listing GET plus the declared verbs, logged like any other abort
    pub fn method_not_allowed(declared: &[Verb]) -> Self {
        let allowed = allow_list(declared);
        tracing::info!(
            "Abort 405: Unexpected HTTP method (allowed: {})",
            allowed.iter().map(Verb::as_str).collect::<Vec<_>>().join(", ")
        );
        ApiError::MethodNotAllowed {
            message: "Unexpected HTTP method".to_string(),
            allowed,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    /// Build the error for `status` and log it: 500s at error level, the rest at info.
    pub fn abort(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("ISE: {}", message);
        } else {
            tracing::info!("Abort {}: {}", status.as_u16(), message);
        }
        match status {
            StatusCode::BAD_REQUEST => ApiError::BadRequest(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::METHOD_NOT_ALLOWED => ApiError::MethodNotAllowed {
                message,
                allowed: vec![Verb::Get],
            },
            _ => ApiError::InternalServerError(message),
        }
    }
}

// Convert other error types to ApiError
impl From<crate::database::store::StoreError> for ApiError {
    fn from(err: crate::database::store::StoreError) -> Self {
        // Don't expose storage internals to clients
        tracing::error!("Storage error: {}", err);
        ApiError::internal_server_error("An error occurred while processing your request")
    }
}

impl From<crate::updates::fields::FieldError> for ApiError {
    fn from(err: crate::updates::fields::FieldError) -> Self {
        ApiError::abort(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<crate::auth::TokenError> for ApiError {
    fn from(err: crate::auth::TokenError) -> Self {
        tracing::debug!("XSRF check failed: {}", err);
        ApiError::abort(StatusCode::BAD_REQUEST, "Invalid XSRF token")
    }
}

impl From<crate::auth::SessionError> for ApiError {
    fn from(err: crate::auth::SessionError) -> Self {
        ApiError::abort(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<crate::services::templates::RenderError> for ApiError {
    fn from(err: crate::services::templates::RenderError) -> Self {
        ApiError::abort(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let allow = self.allow_header();
        let mut response = (self.status(), Json(self.to_json())).into_response();
        if let Some(value) = allow.and_then(|a| HeaderValue::from_str(&a).ok()) {
            response.headers_mut().insert(header::ALLOW, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_maps_status_to_variant() {
        assert_eq!(
            ApiError::abort(StatusCode::BAD_REQUEST, "Missing XSRF token"),
            ApiError::bad_request("Missing XSRF token")
        );
        assert_eq!(ApiError::abort(StatusCode::NOT_FOUND, "gone").status_code(), 404);
        assert_eq!(ApiError::abort(StatusCode::IM_A_TEAPOT, "odd").status_code(), 500);
    }

    #[test]
    fn method_not_allowed_lists_allowed_verbs() {
        let err = ApiError::method_not_allowed(&[Verb::Patch]);
        assert_eq!(err.allow_header().as_deref(), Some("GET, PATCH"));
        assert_eq!(err.to_json()["allowed"], json!(["GET", "PATCH"]));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn method_not_allowed_is_logged() {
        let captured = CapturedLog::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            ApiError::method_not_allowed(&[Verb::Post]);
        });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Abort 405"));
        assert!(logs.contains("GET, POST"));
    }

    #[test]
    fn into_response_sets_allow_header() {
        let response = ApiError::method_not_allowed(&[Verb::Delete]).into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, DELETE");
    }
}
