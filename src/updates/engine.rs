use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use super::fields::{format_field_value, FieldValue};
use super::schema::{
    FieldDescriptor, ACTION_REQUESTED_LABEL, FEATURE_FIELDS, MILESTONE_FIELDS,
    PROTECTED_MILESTONE_LABELS, STAGE_FIELDS,
};
use crate::database::models::{FeatureEntry, Stage};
use crate::database::store::EntityStore;
use crate::error::ApiError;
use crate::services::notifier::Notifier;

/// One requested edit: the raw value and the form field it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEntry {
    pub value: Value,
    pub label: String,
}

/// Caller-supplied `{field: {form_field_name, value}}` mapping. Unknown keys are ignored.
#[derive(Debug, Clone, Default)]
pub struct ChangeRequest {
    entries: Map<String, Value>,
}

impl ChangeRequest {
    pub fn new(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    pub fn from_json(body: &Value) -> Result<Self, ApiError> {
        match body {
            Value::Object(map) => Ok(Self::new(map.clone())),
            _ => Err(ApiError::abort(
                StatusCode::BAD_REQUEST,
                "Expected a JSON object of field changes",
            )),
        }
    }

    /// The entry for a declared field; absent and null both mean "leave alone"
    pub fn entry(&self, field: &str) -> Result<Option<ChangeEntry>, ApiError> {
        match self.entries.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(obj)) => Ok(Some(ChangeEntry {
                value: obj.get("value").cloned().unwrap_or(Value::Null),
                label: obj
                    .get("form_field_name")
                    .and_then(Value::as_str)
                    .unwrap_or(field)
                    .to_string(),
            })),
            Some(_) => Err(ApiError::abort(
                StatusCode::BAD_REQUEST,
                format!("Bad change entry for field {}", field),
            )),
        }
    }

    /// Form field labels of every entry, declared or not
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.values().filter_map(|v| {
            v.as_object()
                .and_then(|obj| obj.get("form_field_name"))
                .and_then(Value::as_str)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub label: String,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
}

/// Ordered audit trail of one update call. Entries can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(Vec<FieldChange>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, change: FieldChange) {
        self.0.push(change);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldChange> {
        self.0.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.label.as_str())
    }

    pub fn into_vec(self) -> Vec<FieldChange> {
        self.0
    }
}

struct PlannedChange<'t, E> {
    descriptor: &'t FieldDescriptor<E>,
    label: String,
    value: FieldValue,
}

/// Applies change requests to entities through their field tables
pub struct EntityUpdater<'a> {
    store: &'a dyn EntityStore,
    notifier: &'a dyn Notifier,
    default_component: &'a str,
}

impl<'a> EntityUpdater<'a> {
    pub fn new(store: &'a dyn EntityStore, notifier: &'a dyn Notifier, default_component: &'a str) -> Self {
        Self {
            store,
            notifier,
            default_component,
        }
    }

    /// Update a stage and its milestones. Persists once when anything was applied.
    ///
    /// Every value is formatted before the first field is touched, so a bad
    /// value or the provisioning guard leaves both the stage and `changed`
    /// untouched.
    pub fn update_stage(
        &self,
        stage: &mut Stage,
        changes: &ChangeRequest,
        changed: &mut ChangeSet,
    ) -> Result<bool, ApiError> {
        let touches_milestones = changes
            .labels()
            .any(|label| PROTECTED_MILESTONE_LABELS.contains(&label));
        if touches_milestones && stage.provisioning_in_progress() {
            return Err(ApiError::abort(
                StatusCode::BAD_REQUEST,
                "Cannot edit OT milestones while creation is in progress.",
            ));
        }

        let stage_changes = self.plan(STAGE_FIELDS, changes)?;
        let milestone_changes = self.plan(MILESTONE_FIELDS, changes)?;

        let action_requested = stage_changes
            .iter()
            .any(|c| c.label == ACTION_REQUESTED_LABEL);
        let was_updated = !stage_changes.is_empty() || !milestone_changes.is_empty();

        apply(stage, stage_changes, changed);
        if !milestone_changes.is_empty() {
            let milestones = stage.milestones.get_or_insert_with(Default::default);
            apply(milestones, milestone_changes, changed);
        }

        if was_updated {
            self.store.put(stage.clone())?;
        }

        if action_requested && stage.is_origin_trial() {
            self.notifier.notify_provisioning_requested(stage);
        }

        Ok(was_updated)
    }

    /// Update a feature's own fields. Persists once when anything was applied.
    pub fn update_feature(
        &self,
        feature: &mut FeatureEntry,
        changes: &ChangeRequest,
        changed: &mut ChangeSet,
    ) -> Result<bool, ApiError> {
        let feature_changes = self.plan(FEATURE_FIELDS, changes)?;
        let was_updated = !feature_changes.is_empty();

        apply(feature, feature_changes, changed);
        if was_updated {
            self.store.put(feature.clone())?;
        }
        Ok(was_updated)
    }

    fn plan<'t, E>(
        &self,
        table: &'t [FieldDescriptor<E>],
        changes: &ChangeRequest,
    ) -> Result<Vec<PlannedChange<'t, E>>, ApiError> {
        let mut planned = Vec::new();
        for descriptor in table {
            let Some(entry) = changes.entry(descriptor.name)? else {
                continue;
            };
            let empty_default = descriptor
                .defaults_to_component
                .then_some(self.default_component);
            let value = format_field_value(
                descriptor.name,
                descriptor.field_type,
                &entry.value,
                empty_default,
            )?;
            planned.push(PlannedChange {
                descriptor,
                label: entry.label,
                value,
            });
        }
        Ok(planned)
    }
}

fn apply<E>(target: &mut E, planned: Vec<PlannedChange<'_, E>>, changed: &mut ChangeSet) {
    for change in planned {
        let old_value = (change.descriptor.get)(target);
        (change.descriptor.set)(target, change.value.clone());
        changed.push(FieldChange {
            label: change.label,
            old_value,
            new_value: change.value,
        });
    }
}
