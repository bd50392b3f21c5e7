pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod permissions;
pub mod services;
pub mod types;
pub mod updates;

pub use app::{router, AppState};
pub use config::AppConfig;
pub use error::ApiError;
