pub mod xsrf;

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub use xsrf::{IssuedToken, TokenError, TokenWindow, XsrfTokenService};

/// Name of the cookie that carries the signed session
pub const SESSION_COOKIE: &str = "session";

/// A signed-in principal. Permission flags are answered by the permission oracle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    email: String,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_lowercase(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Part after the `@`, empty when there is none
    pub fn domain(&self) -> &str {
        self.email.rsplit_once('@').map(|(_, d)| d).unwrap_or("")
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session secret not configured")]
    InvalidSecret,
    #[error("Session token generation error: {0}")]
    TokenGeneration(String),
}

/// Issues and resolves the signed session that identifies the caller
#[derive(Clone)]
pub struct SessionManager {
    secret: String,
    lifetime_hours: i64,
}

impl SessionManager {
    pub fn new(secret: impl Into<String>, lifetime_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_hours,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_hours * 60 * 60
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, SessionError> {
        if self.secret.is_empty() {
            return Err(SessionError::InvalidSecret);
        }

        let now = Utc::now();
        let claims = SessionClaims {
            email: identity.email().to_string(),
            exp: (now + Duration::hours(self.lifetime_hours)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| SessionError::TokenGeneration(e.to_string()))
    }

    /// Identity carried by the request, if any. Bad or expired sessions count as signed out.
    pub fn resolve(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = extract_session_token(headers)?;
        match self.decode(&token) {
            Ok(claims) => Some(Identity::new(claims.email)),
            Err(msg) => {
                tracing::debug!("Ignoring session: {}", msg);
                None
            }
        }
    }

    fn decode(&self, token: &str) -> Result<SessionClaims, String> {
        if self.secret.is_empty() {
            return Err("Session secret not configured".to_string());
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let token_data = decode::<SessionClaims>(token, &decoding_key, &Validation::default())
            .map_err(|e| format!("Invalid session token: {}", e))?;

        Ok(token_data.claims)
    }
}

/// Bearer token first, then the session cookie
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_str) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
