// handlers/public/pages.rs - Page routes served as the single-page-app shell

use std::sync::Arc;

use axum::Router;

use crate::app::AppState;
use crate::handlers::page::{page_route, ConstHandler, PageDefaults, Redirector, SpaHandler};
use crate::handlers::protected::GuideEditPage;
use crate::types::CachePolicy;

/// Every page route. Gating happens per route through `PageDefaults`.
pub fn page_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", page_route(Redirector::new("/roadmap")))
        .route("/roadmap", page_route(SpaHandler::public()))
        .route("/features", page_route(SpaHandler::public()))
        .route("/feature/:feature_id", page_route(SpaHandler::public()))
        .route("/settings", page_route(SpaHandler::new(PageDefaults::signed_in())))
        .route(
            "/guide/new",
            page_route(SpaHandler::new(PageDefaults {
                require_signin: true,
                require_create_feature: true,
                ..PageDefaults::default()
            })),
        )
        .route(
            "/guide/edit/:feature_id",
            page_route(GuideEditPage::new(PageDefaults {
                require_signin: true,
                require_edit_feature: true,
                ..PageDefaults::default()
            })),
        )
        .route(
            "/admin/users/new",
            page_route(SpaHandler::new(PageDefaults {
                require_signin: true,
                require_admin_site: true,
                ..PageDefaults::default()
            })),
        )
        .route(
            "/enterprise",
            page_route(SpaHandler::new(PageDefaults {
                require_signin: true,
                is_enterprise_page: true,
                ..PageDefaults::default()
            })),
        )
        .route(
            "/opensearch.xml",
            page_route(ConstHandler::template("opensearch.xml").cached(CachePolicy::Public)),
        )
        .route("/.well-known/change-password", page_route(Redirector::new("/settings")))
}
