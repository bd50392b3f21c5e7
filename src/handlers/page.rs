// handlers/page.rs - Server-rendered pages and the single-page-app shell
//
// A page's GET hook returns an `EndpointResult`. Template results get the
// common per-request data merged in and are rendered; redirects, JSON and
// pre-rendered bodies pass through. POSTs need an XSRF token unless the page
// is internal or the process runs in unit-test mode.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{any, MethodRouter},
};
use serde_json::{json, Map, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{Identity, TokenWindow};
use crate::database::models::FeatureEntry;
use crate::error::ApiError;
use crate::handlers::base::BaseHandler;
use crate::handlers::context::RequestContext;
use crate::types::{CachePolicy, Verb};

/// Marker in the current path meaning the login page already bounced the caller
const LOGGED_OUT_MARKER: &str = "loginStatus=False";

pub const SPA_TEMPLATE: &str = "spa.html";

/// What a page hook produced
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointResult {
    Rendered { status: StatusCode, body: String },
    Redirect { location: String },
    JsonBody { value: Value },
    /// Data still to be merged with common data and rendered
    Template { status: StatusCode, data: Map<String, Value> },
}

impl EndpointResult {
    pub fn redirect(location: impl Into<String>) -> Self {
        EndpointResult::Redirect {
            location: location.into(),
        }
    }

    pub fn template(data: Map<String, Value>) -> Self {
        EndpointResult::Template {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn empty_template() -> Self {
        Self::template(Map::new())
    }
}

pub trait PageEndpoint: Send + Sync + 'static {
    /// Verbs implemented besides GET. Drives the `Allow` header of 405s.
    fn supported_verbs(&self) -> &'static [Verb] {
        &[]
    }

    fn template_path(&self) -> Option<&str> {
        None
    }

    fn cache_policy(&self) -> Option<CachePolicy> {
        None
    }

    /// Internal pages are called by other services and skip the XSRF check
    fn is_internal(&self) -> bool {
        false
    }

    fn get_template_data(&self, handler: &BaseHandler<'_>) -> Result<EndpointResult, ApiError>;

    fn process_post_data(&self, _handler: &BaseHandler<'_>) -> Result<EndpointResult, ApiError> {
        Err(ApiError::method_not_allowed(self.supported_verbs()))
    }
}

/// Route-level gating flags shared by the reusable pages
#[derive(Debug, Clone, Default)]
pub struct PageDefaults {
    pub require_signin: bool,
    pub require_create_feature: bool,
    pub require_edit_feature: bool,
    pub require_admin_site: bool,
    pub is_enterprise_page: bool,
    pub template_path: Option<String>,
}

impl PageDefaults {
    pub fn signed_in() -> Self {
        Self {
            require_signin: true,
            ..Self::default()
        }
    }

    /// Early result when the caller may not see the page, `None` to proceed
    pub fn check(&self, handler: &BaseHandler<'_>) -> Result<Option<EndpointResult>, ApiError> {
        let permissions = &handler.state.permissions;

        if self.require_signin && handler.current_identity().is_none() {
            return Ok(Some(login_redirect(handler)));
        }

        if self.require_create_feature {
            let Some(identity) = handler.current_identity() else {
                return Ok(Some(login_redirect(handler)));
            };
            if !permissions.can_create_feature(identity) {
                return Err(handler.abort(StatusCode::FORBIDDEN, "Cannot create features"));
            }
        }

        if self.require_edit_feature {
            let Some(feature_id) = handler.ctx.path_param("feature_id") else {
                return Err(handler.abort(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Cannot get feature ID from the URL",
                ));
            };
            let Some(identity) = handler.current_identity() else {
                return Ok(Some(login_redirect(handler)));
            };
            let feature: FeatureEntry = handler.fetch_validated_entity(Some(Value::from(feature_id)))?;
            if !permissions.can_edit_feature(identity, &feature) {
                return Err(handler.abort(StatusCode::FORBIDDEN, "Cannot edit that feature"));
            }
        }

        if self.require_admin_site
            && !handler
                .current_identity()
                .map_or(false, |id| permissions.can_admin_site(id))
        {
            return Err(handler.abort(StatusCode::FORBIDDEN, "Cannot perform admin actions"));
        }

        if self.is_enterprise_page
            && !handler
                .current_identity()
                .map_or(false, |id| permissions.is_restricted_account_kind(id))
        {
            return Err(handler.abort(StatusCode::FORBIDDEN, "You cannot access this page"));
        }

        Ok(None)
    }
}

/// Login redirect, or an empty page when the login flow already sent the caller here
fn login_redirect(handler: &BaseHandler<'_>) -> EndpointResult {
    if handler.ctx.full_path().contains(LOGGED_OUT_MARKER) {
        return EndpointResult::empty_template();
    }
    EndpointResult::redirect(handler.config().app.login_page_url.clone())
}

/// Data every rendered page receives: app metadata, the caller and a fresh XSRF token
pub fn common_data(handler: &BaseHandler<'_>) -> Map<String, Value> {
    let config = handler.config();
    let mut data = Map::new();
    data.insert("prod".into(), json!(config.is_production()));
    data.insert("dev_mode".into(), json!(config.is_development()));
    data.insert("app_title".into(), json!(config.app.app_title));
    data.insert("app_version".into(), json!(config.app.app_version));
    data.insert("current_path".into(), json!(handler.ctx.full_path()));
    data.insert(
        "template_cache_time".into(),
        json!(config.server.template_cache_time_secs),
    );
    data.insert("banner_message".into(), json!(config.app.banner_message));

    match handler.current_identity() {
        Some(identity) => {
            let user = user_summary(handler, identity);
            let issued = handler.state.tokens.issue(Some(identity));
            data.insert("user_json".into(), json!(user.to_string()));
            data.insert("user".into(), user);
            data.insert("xsrf_token".into(), json!(issued.token));
            data.insert("xsrf_token_expires".into(), json!(issued.expires_in_secs));
        }
        None => {
            data.insert("user".into(), Value::Null);
            data.insert("user_json".into(), Value::Null);
            data.insert("xsrf_token".into(), json!(handler.state.tokens.issue(None).token));
            data.insert("xsrf_token_expires".into(), json!(0));
        }
    }
    data
}

/// Permission summary of a signed-in caller as pages and the current-user API see it
pub fn user_summary(handler: &BaseHandler<'_>, identity: &Identity) -> Value {
    let permissions = &handler.state.permissions;
    json!({
        "can_create_feature": permissions.can_create_feature(identity),
        "can_edit_all": permissions.can_edit_any_feature(identity),
        "is_admin": permissions.can_admin_site(identity),
        "editable_features": [],
        "email": identity.email(),
    })
}

/// Run one request through a page and build its response
pub fn dispatch_page(endpoint: &dyn PageEndpoint, ctx: &RequestContext, state: &AppState) -> Response {
    let handler = BaseHandler::new(ctx, state);
    let result = match ctx.verb() {
        Some(Verb::Get) => page_get(endpoint, &handler),
        Some(Verb::Post) => page_post(endpoint, &handler),
        _ => Err(ApiError::method_not_allowed(endpoint.supported_verbs())),
    };

    match result {
        Ok(result) => finish(endpoint, result, state),
        Err(err) => err.into_response(),
    }
}

fn page_get(endpoint: &dyn PageEndpoint, handler: &BaseHandler<'_>) -> Result<EndpointResult, ApiError> {
    if let Some(location) = canonical_location(handler.ctx) {
        info!("Stripping www and redirecting to {:?}", location);
        return Ok(EndpointResult::redirect(location));
    }

    let result = endpoint.get_template_data(handler)?;
    render(endpoint, handler, result)
}

fn page_post(endpoint: &dyn PageEndpoint, handler: &BaseHandler<'_>) -> Result<EndpointResult, ApiError> {
    if !(handler.config().app.unit_test_mode || endpoint.is_internal()) {
        handler.require_signed_in_and_xsrf_token(TokenWindow::Standard)?;
    }
    let result = endpoint.process_post_data(handler)?;
    render(endpoint, handler, result)
}

fn render(
    endpoint: &dyn PageEndpoint,
    handler: &BaseHandler<'_>,
    result: EndpointResult,
) -> Result<EndpointResult, ApiError> {
    match result {
        EndpointResult::Template { status, mut data } => {
            data.extend(common_data(handler));
            let template_path = template_path_for(endpoint, &data)?;
            let body = handler.state.renderer.render(&template_path, &data)?;
            Ok(EndpointResult::Rendered { status, body })
        }
        other => Ok(other),
    }
}

/// URL without the leading `www.` of the host, when there is one
fn canonical_location(ctx: &RequestContext) -> Option<String> {
    let stripped = ctx.host.strip_prefix("www.")?;
    let mut url = url::Url::parse(&ctx.url()).ok()?;
    let host = stripped.split(':').next().unwrap_or(stripped);
    url.set_host(Some(host)).ok()?;
    Some(url.to_string())
}

/// A `template_path` in the data wins over the page's own
fn template_path_for(endpoint: &dyn PageEndpoint, data: &Map<String, Value>) -> Result<String, ApiError> {
    data.get("template_path")
        .and_then(Value::as_str)
        .or_else(|| endpoint.template_path())
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::abort(
                StatusCode::INTERNAL_SERVER_ERROR,
                "No template path was defined for the page or returned in its data",
            )
        })
}

fn finish(endpoint: &dyn PageEndpoint, result: EndpointResult, state: &AppState) -> Response {
    let mut response = match result {
        EndpointResult::Redirect { location } => {
            return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        EndpointResult::Rendered { status, body } => (status, Html(body)).into_response(),
        EndpointResult::JsonBody { value } => Json(value).into_response(),
        EndpointResult::Template { status, data } => (status, Json(Value::Object(data))).into_response(),
    };

    if let Some(value) = endpoint
        .cache_policy()
        .map(|p| p.directive(state.config.server.default_cache_time_secs))
        .and_then(|d| HeaderValue::from_str(&d).ok())
    {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

/// Mount a page on every verb
pub fn page_route(endpoint: impl PageEndpoint) -> MethodRouter<Arc<AppState>> {
    let endpoint: Arc<dyn PageEndpoint> = Arc::new(endpoint);
    any(move |State(state): State<Arc<AppState>>, ctx: RequestContext| {
        let endpoint = Arc::clone(&endpoint);
        async move { serve_page(endpoint, state, ctx).await }
    })
}

async fn serve_page(endpoint: Arc<dyn PageEndpoint>, state: Arc<AppState>, ctx: RequestContext) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "page",
        %request_id,
        method = %ctx.method,
        path = %ctx.path()
    );

    let result = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        dispatch_page(endpoint.as_ref(), &ctx, &state)
    })
    .await;

    result.unwrap_or_else(|e| {
        error!("Page dispatch task failed: {}", e);
        ApiError::internal_server_error("Internal server error").into_response()
    })
}

// Reusable pages

/// Always redirects to a fixed location
pub struct Redirector {
    location: String,
}

impl Redirector {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

impl PageEndpoint for Redirector {
    fn get_template_data(&self, _handler: &BaseHandler<'_>) -> Result<EndpointResult, ApiError> {
        Ok(EndpointResult::redirect(self.location.clone()))
    }
}

/// A template with no page logic, or a JSON constant when no template is set
pub struct ConstHandler {
    defaults: PageDefaults,
    constants: Map<String, Value>,
    cache_policy: Option<CachePolicy>,
}

impl ConstHandler {
    pub fn template(template_path: impl Into<String>) -> Self {
        Self {
            defaults: PageDefaults {
                template_path: Some(template_path.into()),
                ..PageDefaults::default()
            },
            constants: Map::new(),
            cache_policy: None,
        }
    }

    pub fn json(constants: Map<String, Value>) -> Self {
        Self {
            defaults: PageDefaults::default(),
            constants,
            cache_policy: None,
        }
    }

    pub fn require_signin(mut self) -> Self {
        self.defaults.require_signin = true;
        self
    }

    pub fn cached(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = Some(policy);
        self
    }
}

impl PageEndpoint for ConstHandler {
    fn cache_policy(&self) -> Option<CachePolicy> {
        self.cache_policy
    }

    fn get_template_data(&self, handler: &BaseHandler<'_>) -> Result<EndpointResult, ApiError> {
        if self.defaults.require_signin && handler.current_identity().is_none() {
            return Ok(login_redirect(handler));
        }

        match &self.defaults.template_path {
            Some(path) => {
                if !(path.ends_with(".html") || path.ends_with(".xml")) {
                    return Err(handler.abort(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("{} does not end with .html or .xml", path),
                    ));
                }
                let mut data = self.constants.clone();
                data.insert("template_path".into(), json!(path));
                Ok(EndpointResult::template(data))
            }
            None => Ok(EndpointResult::JsonBody {
                value: Value::Object(self.constants.clone()),
            }),
        }
    }
}

/// The single-page-app shell behind the gating flags
pub struct SpaHandler {
    defaults: PageDefaults,
}

impl SpaHandler {
    pub fn new(defaults: PageDefaults) -> Self {
        Self { defaults }
    }

    pub fn public() -> Self {
        Self::new(PageDefaults::default())
    }
}

impl PageEndpoint for SpaHandler {
    fn template_path(&self) -> Option<&str> {
        Some(self.defaults.template_path.as_deref().unwrap_or(SPA_TEMPLATE))
    }

    fn get_template_data(&self, handler: &BaseHandler<'_>) -> Result<EndpointResult, ApiError> {
        Ok(self
            .defaults
            .check(handler)?
            .unwrap_or_else(EndpointResult::empty_template))
    }
}
