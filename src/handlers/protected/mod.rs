// handlers/protected/mod.rs - Endpoints whose hooks act for a signed-in caller
//
// Reads follow the feature's visibility; edits need the edit permission on
// the feature and, like every mutating API call, a valid XSRF token.

pub mod currentuser;
pub mod features;
pub mod guide;
pub mod stages;

pub use currentuser::{CurrentUserPermissions, TokenRefresh};
pub use features::FeatureApi;
pub use guide::GuideEditPage;
pub use stages::StageApi;
