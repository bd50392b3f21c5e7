use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::error::ApiError;
use crate::types::CachePolicy;

/// Prepended to every API body so the response is not a valid script
pub const XSSI_PREFIX: &str = ")]}'\n";

/// JSON response whose body starts with `XSSI_PREFIX`
#[derive(Debug)]
pub struct DefensiveJson {
    pub value: Value,
    pub status: StatusCode,
    pub cache_control: Option<String>,
}

impl DefensiveJson {
    pub fn success(value: Value) -> Self {
        Self::with_status(value, StatusCode::OK)
    }

    pub fn with_status(value: Value, status: StatusCode) -> Self {
        Self {
            value,
            status,
            cache_control: None,
        }
    }

    pub fn cached(mut self, policy: Option<CachePolicy>, max_age_secs: u64) -> Self {
        self.cache_control = policy.map(|p| p.directive(max_age_secs));
        self
    }
}

impl IntoResponse for DefensiveJson {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            defensive_body(&self.value),
        )
            .into_response();

        if let Some(value) = self
            .cache_control
            .and_then(|c| HeaderValue::from_str(&c).ok())
        {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }
        response
    }
}

/// Error counterpart of `DefensiveJson`, keeping the `Allow` header on 405s
pub fn defensive_error(err: ApiError) -> Response {
    let allow = err.allow_header();
    let mut response = DefensiveJson::with_status(err.to_json(), err.status()).into_response();
    if let Some(value) = allow.and_then(|a| HeaderValue::from_str(&a).ok()) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

pub fn defensive_body(value: &Value) -> String {
    format!("{}{}", XSSI_PREFIX, value)
}
