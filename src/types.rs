/// Shared types used across the codebase

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// HTTP verbs an endpoint can declare support for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete];

    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Verb::Get),
            Method::POST => Some(Verb::Post),
            Method::PUT => Some(Verb::Put),
            Method::PATCH => Some(Verb::Patch),
            Method::DELETE => Some(Verb::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    /// Everything except GET needs a signed-in caller and an XSRF token
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Verb::Get)
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the `Allow` header: GET first, then the declared verbs in canonical order
pub fn allow_list(declared: &[Verb]) -> Vec<Verb> {
    Verb::ALL
        .into_iter()
        .filter(|v| *v == Verb::Get || declared.contains(v))
        .collect()
}

/// HTTP cache directive an endpoint may opt into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Public,
    Private,
}

impl CachePolicy {
    pub fn directive(&self, max_age_secs: u64) -> String {
        let kind = match self {
            CachePolicy::Public => "public",
            CachePolicy::Private => "private",
        };
        format!("{}, max-age={}", kind, max_age_secs)
    }
}
