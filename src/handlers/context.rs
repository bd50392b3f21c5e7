// handlers/context.rs - Everything a handler reads from the inbound request

use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

use crate::types::Verb;

/// Snapshot of one request: method, location, headers, query string, path
/// parameters and the decoded body.
///
/// The body is read leniently. A JSON object lands in `body`; a form-encoded
/// body lands in `form`; anything else leaves both empty.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub scheme: String,
    pub host: String,
    pub headers: HeaderMap,
    pub path_params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Map<String, Value>,
    pub form: HashMap<String, String>,
}

impl RequestContext {
    pub fn verb(&self) -> Option<Verb> {
        Verb::from_method(&self.method)
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Path plus query string, always with a `?` as the page layer expects
    pub fn full_path(&self) -> String {
        format!("{}?{}", self.uri.path(), self.uri.query().unwrap_or_default())
    }

    /// Absolute URL of this request as the client addressed it
    pub fn url(&self) -> String {
        let path_and_query = self
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        format!("{}://{}{}", self.scheme, self.host, path_and_query)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn form_field(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    /// Context for a request with no body, used by unit tests
    pub fn from_parts(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let host = host_of(&uri, &headers);
        let query = query_of(&uri);
        Self {
            scheme: scheme_of(&uri, &headers),
            method,
            uri,
            host,
            headers,
            path_params: HashMap::new(),
            query,
            body: Map::new(),
            form: HashMap::new(),
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let path_params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();

        let mut ctx = Self::from_parts(parts.method.clone(), parts.uri.clone(), parts.headers.clone());
        ctx.path_params = path_params;

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(IntoResponse::into_response)?;

        if is_form(&ctx.headers) {
            ctx.form = url::form_urlencoded::parse(&bytes).into_owned().collect();
        } else if !bytes.is_empty() {
            if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(&bytes) {
                ctx.body = map;
            }
        }

        Ok(ctx)
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn host_of(uri: &Uri, headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "localhost".to_string())
}

fn scheme_of(uri: &Uri, headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.scheme_str().map(str::to_string))
        .unwrap_or_else(|| "http".to_string())
}

fn query_of(uri: &Uri) -> HashMap<String, String> {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(q)| q)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn reads_json_body_and_query() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/v0/features/1?page=2")
            .header("host", "example.org")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"featureId": 1}"#))
            .unwrap();

        let ctx = RequestContext::from_request(req, &()).await.unwrap();
        assert_eq!(ctx.verb(), Some(Verb::Post));
        assert_eq!(ctx.query.get("page").map(String::as_str), Some("2"));
        assert_eq!(ctx.body.get("featureId"), Some(&Value::from(1)));
        assert_eq!(ctx.url(), "http://example.org/api/v0/features/1?page=2");
        assert_eq!(ctx.full_path(), "/api/v0/features/1?page=2");
    }

    #[tokio::test]
    async fn reads_form_body_and_ignores_garbage_json() {
        let req = Request::builder()
            .method("POST")
            .uri("/settings")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("token=abc&emails=a%40example.com%2Cb%40example.com"))
            .unwrap();
        let ctx = RequestContext::from_request(req, &()).await.unwrap();
        assert_eq!(ctx.form_field("token"), Some("abc"));
        assert_eq!(ctx.form_field("emails"), Some("a@example.com,b@example.com"));

        let req = Request::builder()
            .method("POST")
            .uri("/api")
            .body(Body::from("not json"))
            .unwrap();
        let ctx = RequestContext::from_request(req, &()).await.unwrap();
        assert!(ctx.body.is_empty());
        assert!(ctx.form.is_empty());
    }

    #[test]
    fn forwarded_proto_sets_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("www.example.org"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        let ctx = RequestContext::from_parts(Method::GET, Uri::from_static("/features"), headers);
        assert_eq!(ctx.url(), "https://www.example.org/features");
        assert_eq!(ctx.full_path(), "/features?");
    }
}
