//! Field tables for each editable entity kind.
//!
//! Each entry ties a field name to its type tag and to a typed getter/setter
//! pair, so the update engine never touches attributes by name at runtime.

use super::fields::{FieldSlot, FieldType, FieldValue};
use crate::database::models::{FeatureEntry, MilestoneSet, Stage};

/// Labels whose edits are refused while trial provisioning is running
pub const PROTECTED_MILESTONE_LABELS: [&str; 2] =
    ["ot_milestone_desktop_start", "ot_milestone_desktop_end"];

/// Label that asks for an origin trial to be created
pub const ACTION_REQUESTED_LABEL: &str = "ot_action_requested";

pub struct FieldDescriptor<E> {
    pub name: &'static str,
    pub field_type: FieldType,
    /// Cleared list fields fall back to the configured default component
    pub defaults_to_component: bool,
    pub get: fn(&E) -> FieldValue,
    pub set: fn(&mut E, FieldValue),
}

impl<E> FieldDescriptor<E> {
    pub const fn with_component_default(mut self) -> Self {
        self.defaults_to_component = true;
        self
    }
}

macro_rules! field {
    ($entity:ty, $name:ident, $tag:ident) => {
        FieldDescriptor::<$entity> {
            name: stringify!($name),
            field_type: FieldType::$tag,
            defaults_to_component: false,
            get: |e: &$entity| FieldSlot::to_field_value(&e.$name),
            set: |e: &mut $entity, v: FieldValue| FieldSlot::assign(&mut e.$name, v),
        }
    };
}

pub static FEATURE_FIELDS: &[FieldDescriptor<FeatureEntry>] = &[
    field!(FeatureEntry, name, Str),
    field!(FeatureEntry, summary, Str),
    field!(FeatureEntry, category, Int),
    field!(FeatureEntry, owner_emails, Emails),
    field!(FeatureEntry, editor_emails, Emails),
    field!(FeatureEntry, cc_emails, Emails),
    field!(FeatureEntry, blink_components, SplitStr).with_component_default(),
    field!(FeatureEntry, search_tags, SplitStr),
    field!(FeatureEntry, spec_link, Link),
    field!(FeatureEntry, bug_url, Link),
    field!(FeatureEntry, doc_links, Links),
    field!(FeatureEntry, sample_links, Links),
    field!(FeatureEntry, screenshot_links, Links),
    field!(FeatureEntry, motivation, Str),
    field!(FeatureEntry, unlisted, Bool),
    field!(FeatureEntry, breaking_change, Bool),
];

pub static STAGE_FIELDS: &[FieldDescriptor<Stage>] = &[
    field!(Stage, browser, Str),
    field!(Stage, intent_thread_url, Link),
    field!(Stage, announcement_url, Link),
    field!(Stage, origin_trial_feedback_url, Link),
    field!(Stage, intent_subject_line, Str),
    field!(Stage, ot_display_name, Str),
    field!(Stage, ot_owner_email, Str),
    field!(Stage, ot_chromium_trial_name, Str),
    field!(Stage, ot_documentation_url, Link),
    field!(Stage, ot_emails, Emails),
    field!(Stage, ot_feedback_submission_url, Link),
    field!(Stage, ot_has_third_party_support, Bool),
    field!(Stage, ot_is_critical_trial, Bool),
    field!(Stage, ot_is_deprecation_trial, Bool),
    field!(Stage, ot_request_note, Str),
    field!(Stage, ot_webfeature_use_counter, Str),
    field!(Stage, ot_require_approvals, Bool),
    field!(Stage, ot_approval_buganizer_component, Int),
    field!(Stage, ot_approval_criteria_url, Link),
    field!(Stage, ot_approval_group_email, Str),
    field!(Stage, ot_action_requested, Bool),
    field!(Stage, experiment_goals, Str),
    field!(Stage, experiment_risks, Str),
    field!(Stage, experiment_extension_reason, Str),
    field!(Stage, rollout_milestone, Int),
    field!(Stage, rollout_platforms, SplitStr),
    field!(Stage, rollout_details, Str),
    field!(Stage, enterprise_policies, SplitStr),
    field!(Stage, pm_emails, Emails),
    field!(Stage, tl_emails, Emails),
    field!(Stage, ux_emails, Emails),
    field!(Stage, te_emails, Emails),
];

pub static MILESTONE_FIELDS: &[FieldDescriptor<MilestoneSet>] = &[
    field!(MilestoneSet, desktop_first, Int),
    field!(MilestoneSet, desktop_last, Int),
    field!(MilestoneSet, android_first, Int),
    field!(MilestoneSet, android_last, Int),
    field!(MilestoneSet, ios_first, Int),
    field!(MilestoneSet, ios_last, Int),
    field!(MilestoneSet, webview_first, Int),
    field!(MilestoneSet, webview_last, Int),
];
