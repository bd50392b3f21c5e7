use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const HSTS: &str = "max-age=63072000; includeSubDomains; preload";
const X_UA_COMPATIBLE: HeaderName = HeaderName::from_static("x-ua-compatible");

/// Adds the fixed security headers to every response, errors included
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS));
    headers.insert(X_UA_COMPATIBLE, HeaderValue::from_static("IE=Edge,chrome=1"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}
