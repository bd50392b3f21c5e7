use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0} must be set in {1:?} mode")]
    MissingSecret(&'static str, Environment),
}

/// Process-wide settings, built once at startup and shared through `AppState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub app: AppSettings,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub permissions: PermissionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub app_title: String,
    pub app_version: String,
    pub login_page_url: String,
    /// Sentinel written to `blink_components` when an edit clears it.
    pub default_component: String,
    pub banner_message: Option<String>,
    /// Skips the XSRF check on page POSTs. Never enable outside tests.
    pub unit_test_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
    pub max_log_line: usize,
    pub default_cache_time_secs: u64,
    pub template_cache_time_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub xsrf_secret: String,
    pub session_secret: String,
    /// Length of one XSRF time bucket.
    pub xsrf_token_timeout_secs: i64,
    /// How far back the refresh endpoint still accepts a token.
    pub xsrf_refresh_timeout_secs: i64,
    pub session_lifetime_hours: i64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionConfig {
    pub site_admins: Vec<String>,
    pub site_editors: Vec<String>,
    pub creator_domains: Vec<String>,
    pub restricted_account_domains: Vec<String>,
}

const DEV_XSRF_SECRET: &str = "development-xsrf-secret";
const DEV_SESSION_SECRET: &str = "development-session-secret";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides();

        config.validate()
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.environment != Environment::Development {
            if self.security.xsrf_secret.is_empty() {
                return Err(ConfigError::MissingSecret("XSRF_SECRET", self.environment));
            }
            if self.security.session_secret.is_empty() {
                return Err(ConfigError::MissingSecret("SESSION_SECRET", self.environment));
            }
        }
        Ok(self)
    }

    fn with_env_overrides(mut self) -> Self {
        // App overrides
        if let Ok(v) = env::var("APP_TITLE") {
            self.app.app_title = v;
        }
        if let Ok(v) = env::var("APP_VERSION") {
            self.app.app_version = v;
        }
        if let Ok(v) = env::var("LOGIN_PAGE_URL") {
            self.app.login_page_url = v;
        }
        if let Ok(v) = env::var("DEFAULT_COMPONENT") {
            self.app.default_component = v;
        }
        if let Ok(v) = env::var("BANNER_MESSAGE") {
            self.app.banner_message = Some(v).filter(|s| !s.is_empty());
        }

        // Server overrides
        if let Ok(v) = env::var("FEATUREDESK_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }
        if let Ok(v) = env::var("SERVER_MAX_LOG_LINE") {
            self.server.max_log_line = v.parse().unwrap_or(self.server.max_log_line);
        }
        if let Ok(v) = env::var("SERVER_DEFAULT_CACHE_TIME_SECS") {
            self.server.default_cache_time_secs = v.parse().unwrap_or(self.server.default_cache_time_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("XSRF_SECRET") {
            self.security.xsrf_secret = v;
        }
        if let Ok(v) = env::var("SESSION_SECRET") {
            self.security.session_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_XSRF_TOKEN_TIMEOUT_SECS") {
            self.security.xsrf_token_timeout_secs = v.parse().unwrap_or(self.security.xsrf_token_timeout_secs);
        }
        if let Ok(v) = env::var("SECURITY_XSRF_REFRESH_TIMEOUT_SECS") {
            self.security.xsrf_refresh_timeout_secs = v.parse().unwrap_or(self.security.xsrf_refresh_timeout_secs);
        }
        if let Ok(v) = env::var("SECURITY_SESSION_LIFETIME_HOURS") {
            self.security.session_lifetime_hours = v.parse().unwrap_or(self.security.session_lifetime_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        // Permission overrides
        if let Ok(v) = env::var("SITE_ADMINS") {
            self.permissions.site_admins = split_list(&v);
        }
        if let Ok(v) = env::var("SITE_EDITORS") {
            self.permissions.site_editors = split_list(&v);
        }
        if let Ok(v) = env::var("CREATOR_DOMAINS") {
            self.permissions.creator_domains = split_list(&v);
        }
        if let Ok(v) = env::var("RESTRICTED_ACCOUNT_DOMAINS") {
            self.permissions.restricted_account_domains = split_list(&v);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            app: AppSettings::default_for("Undeployed"),
            server: ServerConfig {
                port: 3000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                max_log_line: 200,
                default_cache_time_secs: 60,
                template_cache_time_secs: 0,
            },
            security: SecurityConfig {
                xsrf_secret: DEV_XSRF_SECRET.to_string(),
                session_secret: DEV_SESSION_SECRET.to_string(),
                xsrf_token_timeout_secs: 60 * 60,
                xsrf_refresh_timeout_secs: 30 * 24 * 60 * 60,
                session_lifetime_hours: 24 * 7,
                cors_origins: vec!["http://localhost:5173".to_string()],
            },
            permissions: PermissionConfig {
                site_admins: vec![],
                site_editors: vec![],
                creator_domains: vec!["example.com".to_string()],
                restricted_account_domains: vec!["example.com".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            app: AppSettings::default_for(env!("CARGO_PKG_VERSION")),
            server: ServerConfig {
                port: 8080,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
                max_log_line: 200,
                default_cache_time_secs: 600,
                template_cache_time_secs: 600,
            },
            security: SecurityConfig {
                xsrf_secret: String::new(),
                session_secret: String::new(),
                xsrf_token_timeout_secs: 60 * 60,
                xsrf_refresh_timeout_secs: 30 * 24 * 60 * 60,
                session_lifetime_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            permissions: PermissionConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            app: AppSettings::default_for(env!("CARGO_PKG_VERSION")),
            server: ServerConfig {
                port: 8080,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                max_log_line: 200,
                default_cache_time_secs: 600,
                template_cache_time_secs: 600,
            },
            security: SecurityConfig {
                xsrf_secret: String::new(),
                session_secret: String::new(),
                xsrf_token_timeout_secs: 60 * 60,
                xsrf_refresh_timeout_secs: 30 * 24 * 60 * 60,
                session_lifetime_hours: 12,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            permissions: PermissionConfig::default(),
        }
    }
}

impl AppSettings {
    fn default_for(app_version: &str) -> Self {
        Self {
            app_title: "Feature Desk".to_string(),
            app_version: app_version.to_string(),
            login_page_url: "/?loginStatus=False".to_string(),
            default_component: "Blink".to_string(),
            banner_message: None,
            unit_test_mode: false,
        }
    }
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.is_development());
        assert!(!config.security.xsrf_secret.is_empty());
        assert_eq!(config.security.xsrf_token_timeout_secs, 3600);
    }

    #[test]
    fn test_production_requires_secrets() {
        let config = AppConfig::production();
        assert!(config.is_production());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("XSRF_SECRET"));
    }

    #[test]
    fn test_production_with_secrets_validates() {
        let mut config = AppConfig::production();
        config.security.xsrf_secret = "x".into();
        config.security.session_secret = "s".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list(" a@x.com, ,b@x.com,"), vec!["a@x.com", "b@x.com"]);
    }
}
