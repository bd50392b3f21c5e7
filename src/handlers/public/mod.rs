// handlers/public/mod.rs - Endpoints reachable without a session
//
// The mock login establishes a session in development. Pages are the
// single-page-app shell and a few fixed redirects and templates; their
// gating flags decide per route who may see them.

pub mod login;
pub mod pages;

pub use login::MockLogin;
pub use pages::page_routes;
