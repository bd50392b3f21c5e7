// handlers/protected/features.rs - GET/PATCH /api/v0/features/:feature_id

use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::api::ApiEndpoint;
use crate::handlers::base::BaseHandler;
use crate::types::Verb;
use crate::updates::{ChangeRequest, ChangeSet};

pub struct FeatureApi;

impl ApiEndpoint for FeatureApi {
    fn supported_verbs(&self) -> &'static [Verb] {
        &[Verb::Patch]
    }

    fn do_get(&self, handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        let feature_id = handler.path_int("feature_id")?;
        let feature = handler.get_specified_feature(Some(feature_id))?;
        handler.to_json(&feature)
    }

    /// Body: `{field: {"form_field_name": label, "value": raw}}` for any feature fields
    fn do_patch(&self, handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        let feature_id = handler.path_int("feature_id")?;
        let mut feature = handler.get_editable_feature(feature_id)?;

        let changes = ChangeRequest::new(handler.ctx.body.clone());
        let mut changed = ChangeSet::new();
        let updated = handler
            .updater()
            .update_feature(&mut feature, &changes, &mut changed)?;

        let message = if updated {
            format!("Feature {} updated.", feature_id)
        } else {
            format!("Feature {} unchanged.", feature_id)
        };
        Ok(json!({
            "message": message,
            "changes": handler.to_json(&changed)?,
        }))
    }
}
