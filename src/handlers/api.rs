// handlers/api.rs - JSON API endpoints and their verb dispatch
//
// GET is open to everyone. Every other verb needs a signed-in caller with a
// valid XSRF token before its hook runs; a login endpoint's POST is exempt.
// All bodies, errors included, carry the XSSI prefix.

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{any, MethodRouter},
};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::TokenWindow;
use crate::error::ApiError;
use crate::handlers::base::BaseHandler;
use crate::handlers::context::RequestContext;
use crate::middleware::response::{defensive_error, DefensiveJson};
use crate::types::{CachePolicy, Verb};

pub trait ApiEndpoint: Send + Sync + 'static {
    /// Verbs implemented besides GET. Drives the `Allow` header of 405s.
    fn supported_verbs(&self) -> &'static [Verb] {
        &[]
    }

    /// POST skips the XSRF check; used by endpoints that establish the session
    fn is_login_endpoint(&self) -> bool {
        false
    }

    fn token_window(&self) -> TokenWindow {
        TokenWindow::Standard
    }

    fn cache_policy(&self) -> Option<CachePolicy> {
        None
    }

    fn do_get(&self, handler: &BaseHandler<'_>) -> Result<Value, ApiError>;

    fn do_post(&self, _handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        Err(ApiError::method_not_allowed(self.supported_verbs()))
    }

    fn do_put(&self, _handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        Err(ApiError::method_not_allowed(self.supported_verbs()))
    }

    fn do_patch(&self, _handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        Err(ApiError::method_not_allowed(self.supported_verbs()))
    }

    fn do_delete(&self, _handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        Err(ApiError::method_not_allowed(self.supported_verbs()))
    }
}

/// Run one request through an endpoint and build the prefixed JSON response
pub fn dispatch_api(endpoint: &dyn ApiEndpoint, ctx: &RequestContext, state: &AppState) -> Response {
    let handler = BaseHandler::new(ctx, state);
    match run(endpoint, &handler) {
        Ok(value) => DefensiveJson::success(value)
            .cached(endpoint.cache_policy(), state.config.server.default_cache_time_secs)
            .into_response(),
        Err(err) => defensive_error(err),
    }
}

fn run(endpoint: &dyn ApiEndpoint, handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
    let Some(verb) = handler.ctx.verb() else {
        return Err(ApiError::method_not_allowed(endpoint.supported_verbs()));
    };

    if verb == Verb::Post {
        log_post_body(handler);
    }

    let exempt = verb == Verb::Post && endpoint.is_login_endpoint();
    if verb.is_mutating() && !exempt {
        handler.require_signed_in_and_xsrf_token(endpoint.token_window())?;
    }

    match verb {
        Verb::Get => endpoint.do_get(handler),
        Verb::Post => endpoint.do_post(handler),
        Verb::Put => endpoint.do_put(handler),
        Verb::Patch => endpoint.do_patch(handler),
        Verb::Delete => endpoint.do_delete(handler),
    }
}

fn log_post_body(handler: &BaseHandler<'_>) {
    let max = handler.config().server.max_log_line;
    info!("POST data is:");
    for (key, value) in &handler.ctx.body {
        let shown: String = value.to_string().chars().take(max).collect();
        info!("{:?}: {}", key, shown);
    }
}

/// Mount an endpoint on every verb; unknown verbs reach it and get a 405
pub fn api_route(endpoint: impl ApiEndpoint) -> MethodRouter<Arc<AppState>> {
    let endpoint: Arc<dyn ApiEndpoint> = Arc::new(endpoint);
    any(move |State(state): State<Arc<AppState>>, ctx: RequestContext| {
        let endpoint = Arc::clone(&endpoint);
        async move { serve_api(endpoint, state, ctx).await }
    })
}

/// Handlers block on storage, so dispatch runs off the async executor
async fn serve_api(endpoint: Arc<dyn ApiEndpoint>, state: Arc<AppState>, ctx: RequestContext) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "dispatch",
        %request_id,
        method = %ctx.method,
        path = %ctx.path()
    );

    let result = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        dispatch_api(endpoint.as_ref(), &ctx, &state)
    })
    .await;

    match result {
        Ok(response) => response,
        Err(e) => {
            error!("API dispatch task failed: {}", e);
            defensive_error(ApiError::internal_server_error("Internal server error"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::config::AppConfig;
    use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
    use serde_json::json;

    struct Echo;

    impl ApiEndpoint for Echo {
        fn supported_verbs(&self) -> &'static [Verb] {
            &[Verb::Post]
        }

        fn do_get(&self, _handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
            Ok(json!({"ok": true}))
        }

        fn do_post(&self, handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
            Ok(json!({"email": handler.require_identity()?.email()}))
        }
    }

    fn state() -> AppState {
        AppState::in_memory(AppConfig::development())
    }

    fn ctx(method: Method, headers: HeaderMap, body: Value) -> RequestContext {
        let mut ctx = RequestContext::from_parts(method, Uri::from_static("/api/v0/echo"), headers);
        if let Value::Object(map) = body {
            ctx.body = map;
        }
        ctx
    }

    fn signed_in(state: &AppState, email: &str) -> HeaderMap {
        let session = state.sessions.issue(&Identity::new(email)).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", session)).unwrap(),
        );
        headers
    }

    #[test]
    fn get_needs_no_token() {
        let state = state();
        let response = dispatch_api(&Echo, &ctx(Method::GET, HeaderMap::new(), Value::Null), &state);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn post_without_token_is_rejected_before_identity() {
        let state = state();
        let response = dispatch_api(&Echo, &ctx(Method::POST, HeaderMap::new(), json!({})), &state);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn post_with_body_token_reaches_hook() {
        let state = state();
        let headers = signed_in(&state, "a@example.com");
        let token = state.tokens.issue(Some(&Identity::new("a@example.com"))).token;
        let response = dispatch_api(&Echo, &ctx(Method::POST, headers, json!({"token": token})), &state);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn unimplemented_verb_lists_declared_ones() {
        let state = state();
        let mut headers = signed_in(&state, "a@example.com");
        let token = state.tokens.issue(Some(&Identity::new("a@example.com"))).token;
        headers.insert("x-xsrf-token", HeaderValue::from_str(&token).unwrap());
        let response = dispatch_api(&Echo, &ctx(Method::DELETE, headers, Value::Null), &state);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST");
    }
}
