// handlers/protected/currentuser.rs - /api/v0/currentuser/*

use serde_json::{json, Value};

use crate::auth::TokenWindow;
use crate::error::ApiError;
use crate::handlers::api::ApiEndpoint;
use crate::handlers::base::BaseHandler;
use crate::handlers::page::user_summary;
use crate::types::Verb;

/// GET /api/v0/currentuser/permissions - what the caller may do, or `null`
pub struct CurrentUserPermissions;

impl ApiEndpoint for CurrentUserPermissions {
    fn do_get(&self, handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        let user = handler
            .current_identity()
            .map(|identity| user_summary(handler, identity))
            .unwrap_or(Value::Null);
        Ok(json!({ "user": user }))
    }
}

/// POST /api/v0/currentuser/token - trade an aging XSRF token for a fresh one
///
/// The presented token is checked against the refresh window, so a page left
/// open for days can still renew it.
pub struct TokenRefresh;

impl ApiEndpoint for TokenRefresh {
    fn supported_verbs(&self) -> &'static [Verb] {
        &[Verb::Post]
    }

    fn token_window(&self) -> TokenWindow {
        TokenWindow::Refresh
    }

    fn do_get(&self, _handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        Err(ApiError::method_not_allowed(self.supported_verbs()))
    }

    fn do_post(&self, handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        let identity = handler.require_identity()?;
        let issued = handler.state.tokens.issue(Some(identity));
        Ok(json!({
            "token": issued.token,
            "token_expires_sec": issued.expires_in_secs,
        }))
    }
}
