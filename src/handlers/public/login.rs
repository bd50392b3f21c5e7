// handlers/public/login.rs - POST /dev/mock_login

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::handlers::api::ApiEndpoint;
use crate::handlers::base::{BaseHandler, ParamSpec};
use crate::types::Verb;

/// Signs in as any email address. Development only; exempt from the XSRF check.
///
/// Expected input: `{"email": "user@example.com"}`. The response carries the
/// session token for the `Authorization: Bearer` header or the `session`
/// cookie, plus an XSRF token issued to the new identity.
pub struct MockLogin;

impl ApiEndpoint for MockLogin {
    fn supported_verbs(&self) -> &'static [Verb] {
        &[Verb::Post]
    }

    fn is_login_endpoint(&self) -> bool {
        true
    }

    fn do_get(&self, _handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        Err(ApiError::method_not_allowed(self.supported_verbs()))
    }

    fn do_post(&self, handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        if !handler.config().is_development() {
            return Err(handler.abort(
                StatusCode::FORBIDDEN,
                "Mock login is only available in development",
            ));
        }

        let looks_like_email = |v: &Value| v.as_str().map_or(false, |s| s.contains('@'));
        let email = handler
            .get_param("email", ParamSpec::required().validator(&looks_like_email))?
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| handler.abort(StatusCode::BAD_REQUEST, "Invalid value for parameter 'email'"))?;

        let identity = Identity::new(email);
        let session_token = handler.state.sessions.issue(&identity)?;
        let xsrf = handler.state.tokens.issue(Some(&identity));
        tracing::info!("Mock login as {}", identity.email());

        Ok(json!({
            "email": identity.email(),
            "session_token": session_token,
            "session_expires_sec": handler.state.sessions.lifetime_secs(),
            "token": xsrf.token,
            "token_expires_sec": xsrf.expires_in_secs,
        }))
    }
}
