// handlers/base.rs - Request helpers shared by API and page endpoints

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::app::AppState;
use crate::auth::{Identity, TokenWindow};
use crate::config::AppConfig;
use crate::database::models::{FeatureEntry, Stage};
use crate::database::store::Entity;
use crate::error::ApiError;
use crate::handlers::context::RequestContext;
use crate::updates::fields::{extract_link, split_input, truthy, Delimiter};
use crate::updates::EntityUpdater;

/// Header that carries the XSRF token on API calls
pub const XSRF_HEADER: &str = "x-xsrf-token";

/// How `BaseHandler::get_param` treats a body parameter
pub struct ParamSpec<'v> {
    default: Option<Value>,
    required: bool,
    validator: Option<&'v dyn Fn(&Value) -> bool>,
    allowed: Option<&'v [Value]>,
}

impl<'v> ParamSpec<'v> {
    pub fn required() -> Self {
        Self {
            default: None,
            required: true,
            validator: None,
            allowed: None,
        }
    }

    pub fn optional() -> Self {
        Self {
            required: false,
            ..Self::required()
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: &'v dyn Fn(&Value) -> bool) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn allowed(mut self, allowed: &'v [Value]) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

/// One request's view of the application: its context, shared state and caller
pub struct BaseHandler<'a> {
    pub ctx: &'a RequestContext,
    pub state: &'a AppState,
    identity: Option<Identity>,
}

impl<'a> BaseHandler<'a> {
    pub fn new(ctx: &'a RequestContext, state: &'a AppState) -> Self {
        let identity = state.sessions.resolve(&ctx.headers);
        Self {
            ctx,
            state,
            identity,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.config
    }

    /// Logged error for `status`; return it with `Err(..)` to end the request
    pub fn abort(&self, status: StatusCode, message: impl Into<String>) -> ApiError {
        ApiError::abort(status, message)
    }

    pub fn current_identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn require_identity(&self) -> Result<&Identity, ApiError> {
        self.identity
            .as_ref()
            .ok_or_else(|| self.abort(StatusCode::FORBIDDEN, "User must be signed in"))
    }

    pub fn updater(&self) -> EntityUpdater<'_> {
        EntityUpdater::new(
            self.state.store.as_ref(),
            self.state.notifier.as_ref(),
            &self.state.config.app.default_component,
        )
    }

    // Body parameters

    pub fn get_param(&self, name: &str, spec: ParamSpec<'_>) -> Result<Option<Value>, ApiError> {
        let value = match self.ctx.body.get(name) {
            Some(Value::Null) | None => spec.default,
            Some(v) => Some(v.clone()),
        };

        let Some(value) = value else {
            if spec.required {
                return Err(self.abort(
                    StatusCode::BAD_REQUEST,
                    format!("Missing parameter '{}'", name),
                ));
            }
            return Ok(None);
        };

        if truthy(&value) {
            if let Some(validator) = spec.validator {
                if !validator(&value) {
                    return Err(self.abort(
                        StatusCode::BAD_REQUEST,
                        format!("Invalid value for parameter '{}'", name),
                    ));
                }
            }
            if let Some(allowed) = spec.allowed {
                if !allowed.contains(&value) {
                    return Err(self.abort(
                        StatusCode::BAD_REQUEST,
                        format!("Unexpected value for parameter '{}'", name),
                    ));
                }
            }
        }
        Ok(Some(value))
    }

    pub fn get_int_param(&self, name: &str, spec: ParamSpec<'_>) -> Result<Option<i64>, ApiError> {
        let Some(value) = self.get_param(name, spec)? else {
            return Ok(None);
        };
        match value.as_i64() {
            Some(n) => Ok(Some(n)),
            None if !truthy(&value) => Ok(None),
            None => Err(self.abort(
                StatusCode::BAD_REQUEST,
                format!("Parameter '{}' was not an int", name),
            )),
        }
    }

    pub fn get_bool_param(&self, name: &str, default: bool, required: bool) -> Result<bool, ApiError> {
        let spec = if required {
            ParamSpec::required()
        } else {
            ParamSpec::optional().default_value(default)
        };
        match self.get_param(name, spec)? {
            Some(Value::Bool(b)) => Ok(b),
            _ => Err(self.abort(
                StatusCode::BAD_REQUEST,
                format!("Parameter '{}' was not a bool", name),
            )),
        }
    }

    // Query string arguments

    pub fn get_query_bool(&self, name: &str, default: bool) -> bool {
        match self.ctx.query.get(name) {
            Some(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | ""),
            None => default,
        }
    }

    /// Non-negative integer argument. An empty or absent argument yields `default`.
    pub fn get_query_int(&self, name: &str, default: Option<i64>) -> Result<Option<i64>, ApiError> {
        let raw = match self.ctx.query.get(name).filter(|v| !v.is_empty()) {
            Some(v) => v,
            None => return Ok(default),
        };
        let num: i64 = raw.trim().parse().map_err(|_| {
            self.abort(
                StatusCode::BAD_REQUEST,
                format!("Request parameter '{}' was not an int", name),
            )
        })?;
        if num < 0 {
            return Err(self.abort(
                StatusCode::BAD_REQUEST,
                format!("Request parameter '{}' out of range: '{}'", name, raw),
            ));
        }
        Ok(Some(num))
    }

    /// Integer route parameter. A route without it is misconfigured.
    pub fn path_int(&self, name: &str) -> Result<i64, ApiError> {
        let raw = self.ctx.path_param(name).ok_or_else(|| {
            self.abort(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Cannot get {} from the URL", name),
            )
        })?;
        raw.trim()
            .parse()
            .map_err(|_| self.abort(StatusCode::BAD_REQUEST, format!("Invalid {}: {}.", name, raw)))
    }

    // Entities

    /// Coerce `id`, fetch the entity and fail with 400 or 404 as appropriate
    pub fn fetch_validated_entity<E: Entity>(&self, id: Option<Value>) -> Result<E, ApiError> {
        let kind = E::KIND;
        let Some(raw) = id.filter(|v| !v.is_null()) else {
            return Err(self.abort(StatusCode::BAD_REQUEST, format!("No {} ID specified.", kind)));
        };
        let parsed = match &raw {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        let Some(id) = parsed else {
            let shown = match &raw {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(self.abort(
                StatusCode::BAD_REQUEST,
                format!("Invalid {} ID: {}.", kind, shown),
            ));
        };

        self.state
            .store
            .as_ref()
            .fetch::<E>(id)?
            .ok_or_else(|| self.abort(StatusCode::NOT_FOUND, format!("{} {} not found.", kind, id)))
    }

    /// Feature named by `feature_id` or the `featureId` body parameter, if the caller may view it
    pub fn get_specified_feature(&self, feature_id: Option<i64>) -> Result<FeatureEntry, ApiError> {
        let feature_id = match feature_id {
            Some(id) => id,
            None => self.required_int_param("featureId")?,
        };
        let feature: FeatureEntry = self
            .state
            .store
            .as_ref()
            .fetch(feature_id)?
            .ok_or_else(|| self.abort(StatusCode::NOT_FOUND, "Feature not found"))?;
        if !self
            .state
            .permissions
            .can_view_feature(self.current_identity(), &feature)
        {
            return Err(self.abort(StatusCode::FORBIDDEN, "Cannot view that feature"));
        }
        Ok(feature)
    }

    pub fn get_specified_stage(&self, stage_id: Option<i64>) -> Result<Stage, ApiError> {
        let stage_id = match stage_id {
            Some(id) => id,
            None => self.required_int_param("stage_id")?,
        };
        self.state
            .store
            .as_ref()
            .fetch(stage_id)?
            .ok_or_else(|| self.abort(StatusCode::NOT_FOUND, "Stage not found"))
    }

    /// Feature the caller may view and edit
    pub fn get_editable_feature(&self, feature_id: i64) -> Result<FeatureEntry, ApiError> {
        let identity = self.require_identity()?;
        let feature = self.get_specified_feature(Some(feature_id))?;
        if !self.state.permissions.can_edit_feature(identity, &feature) {
            return Err(self.abort(StatusCode::FORBIDDEN, "Cannot edit that feature"));
        }
        Ok(feature)
    }

    fn required_int_param(&self, name: &str) -> Result<i64, ApiError> {
        self.get_int_param(name, ParamSpec::required())?.ok_or_else(|| {
            self.abort(StatusCode::BAD_REQUEST, format!("Missing parameter '{}'", name))
        })
    }

    // Form fields

    pub fn split_input(&self, field: &str, delimiter: Delimiter) -> Vec<String> {
        split_input(self.ctx.form_field(field).unwrap_or_default(), delimiter)
    }

    pub fn split_emails(&self, field: &str) -> Vec<String> {
        self.split_input(field, Delimiter::Comma)
    }

    pub fn parse_link(&self, field: &str) -> Option<String> {
        self.ctx.form_field(field).and_then(extract_link)
    }

    pub fn parse_links(&self, field: &str) -> Vec<String> {
        self.split_input(field, Delimiter::Newline)
            .iter()
            .filter_map(|s| extract_link(s))
            .collect()
    }

    pub fn parse_int(&self, field: &str) -> Result<Option<i64>, ApiError> {
        match self.ctx.form_field(field).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(v) => v.trim().parse().map(Some).map_err(|_| {
                self.abort(
                    StatusCode::BAD_REQUEST,
                    format!("Parameter '{}' was not an int", field),
                )
            }),
        }
    }

    pub fn to_json<T: Serialize>(&self, value: &T) -> Result<Value, ApiError> {
        serde_json::to_value(value)
            .map_err(|e| self.abort(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    // XSRF

    /// Token from the `X-Xsrf-Token` header, else a `token` body or form field
    pub fn presented_token(&self) -> Option<String> {
        self.ctx
            .header(XSRF_HEADER)
            .map(str::to_string)
            .or_else(|| {
                self.ctx
                    .body
                    .get("token")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .or_else(|| self.ctx.form_field("token").map(str::to_string))
            .filter(|t| !t.is_empty())
    }

    /// Require a signed-in caller presenting a token issued to them
    pub fn require_signed_in_and_xsrf_token(&self, window: TokenWindow) -> Result<&Identity, ApiError> {
        let token = self
            .presented_token()
            .ok_or_else(|| self.abort(StatusCode::BAD_REQUEST, "Missing XSRF token"))?;
        let identity = self.require_identity()?;
        self.state.tokens.validate(&token, Some(identity), window)?;
        Ok(identity)
    }
}
