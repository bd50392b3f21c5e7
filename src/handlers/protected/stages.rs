// handlers/protected/stages.rs - GET/PATCH /api/v0/features/:feature_id/stages/:stage_id

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::database::models::{FeatureEntry, Stage};
use crate::error::ApiError;
use crate::handlers::api::ApiEndpoint;
use crate::handlers::base::BaseHandler;
use crate::types::Verb;
use crate::updates::{ChangeRequest, ChangeSet};

pub struct StageApi;

impl StageApi {
    /// The stage, provided it belongs to the feature named in the path
    fn stage_of(&self, handler: &BaseHandler<'_>, feature: &FeatureEntry) -> Result<Stage, ApiError> {
        let stage_id = handler.path_int("stage_id")?;
        let stage = handler.get_specified_stage(Some(stage_id))?;
        if stage.feature_id != feature.id {
            return Err(handler.abort(StatusCode::NOT_FOUND, "Stage not found"));
        }
        Ok(stage)
    }
}

impl ApiEndpoint for StageApi {
    fn supported_verbs(&self) -> &'static [Verb] {
        &[Verb::Patch]
    }

    fn do_get(&self, handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        let feature = handler.get_specified_feature(Some(handler.path_int("feature_id")?))?;
        let stage = self.stage_of(handler, &feature)?;
        handler.to_json(&stage)
    }

    /// Body: stage and milestone fields as `{field: {"form_field_name", "value"}}`.
    /// Only the stage is persisted; its feature is read for permissions.
    fn do_patch(&self, handler: &BaseHandler<'_>) -> Result<Value, ApiError> {
        let feature = handler.get_editable_feature(handler.path_int("feature_id")?)?;
        let mut stage = self.stage_of(handler, &feature)?;

        let changes = ChangeRequest::new(handler.ctx.body.clone());
        let mut changed = ChangeSet::new();
        let updated = handler
            .updater()
            .update_stage(&mut stage, &changes, &mut changed)?;

        let message = if updated {
            format!("Stage {} updated.", stage.id)
        } else {
            format!("Stage {} unchanged.", stage.id)
        };
        Ok(json!({
            "message": message,
            "changes": handler.to_json(&changed)?,
        }))
    }
}
