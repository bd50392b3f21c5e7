// handlers/mod.rs - Request handling in two tiers
//
// Public (no session needed to reach the hook) and protected (the hook
// requires a signed-in caller). Both tiers share the dispatch machinery in
// `api` and `page`, built on the helpers in `base` and `context`.

pub mod api;
pub mod base;
pub mod context;
pub mod page;

pub mod protected;
pub mod public;

pub use api::{api_route, dispatch_api, ApiEndpoint};
pub use base::{BaseHandler, ParamSpec};
pub use context::RequestContext;
pub use page::{dispatch_page, page_route, EndpointResult, PageDefaults, PageEndpoint};
