use serde::{Deserialize, Serialize};

pub const STAGE_BLINK_ORIGIN_TRIAL: i64 = 150;
pub const STAGE_FAST_ORIGIN_TRIAL: i64 = 250;
pub const STAGE_DEP_DEPRECATION_TRIAL: i64 = 450;
pub const STAGE_BLINK_SHIPPING: i64 = 160;

/// Stage types that represent an origin trial and so can request trial creation
pub const ALL_ORIGIN_TRIAL_STAGE_TYPES: [i64; 3] = [
    STAGE_BLINK_ORIGIN_TRIAL,
    STAGE_FAST_ORIGIN_TRIAL,
    STAGE_DEP_DEPRECATION_TRIAL,
];

/// Where the external origin trial provisioning workflow stands for a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtSetupStatus {
    NotCreated,
    ReadyForCreation,
    CreationFailed,
    ActivationFailed,
    Created,
}

impl OtSetupStatus {
    /// The provisioning workflow may still act on the stage's schedule
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            OtSetupStatus::ReadyForCreation
                | OtSetupStatus::CreationFailed
                | OtSetupStatus::ActivationFailed
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneSet {
    pub desktop_first: Option<i64>,
    pub desktop_last: Option<i64>,
    pub android_first: Option<i64>,
    pub android_last: Option<i64>,
    pub ios_first: Option<i64>,
    pub ios_last: Option<i64>,
    pub webview_first: Option<i64>,
    pub webview_last: Option<i64>,
}

/// One process phase of a feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: i64,
    pub feature_id: i64,
    pub stage_type: i64,
    pub ot_setup_status: Option<OtSetupStatus>,
    pub milestones: Option<MilestoneSet>,

    pub browser: Option<String>,
    pub intent_thread_url: Option<String>,
    pub announcement_url: Option<String>,
    pub origin_trial_feedback_url: Option<String>,
    pub intent_subject_line: Option<String>,

    pub ot_display_name: Option<String>,
    pub ot_owner_email: Option<String>,
    pub ot_chromium_trial_name: Option<String>,
    pub ot_documentation_url: Option<String>,
    pub ot_emails: Vec<String>,
    pub ot_feedback_submission_url: Option<String>,
    pub ot_has_third_party_support: bool,
    pub ot_is_critical_trial: bool,
    pub ot_is_deprecation_trial: bool,
    pub ot_request_note: Option<String>,
    pub ot_webfeature_use_counter: Option<String>,
    pub ot_require_approvals: bool,
    pub ot_approval_buganizer_component: Option<i64>,
    pub ot_approval_criteria_url: Option<String>,
    pub ot_approval_group_email: Option<String>,
    pub ot_action_requested: bool,

    pub experiment_goals: Option<String>,
    pub experiment_risks: Option<String>,
    pub experiment_extension_reason: Option<String>,

    pub rollout_milestone: Option<i64>,
    pub rollout_platforms: Vec<String>,
    pub rollout_details: Option<String>,
    pub enterprise_policies: Vec<String>,

    pub pm_emails: Vec<String>,
    pub tl_emails: Vec<String>,
    pub ux_emails: Vec<String>,
    pub te_emails: Vec<String>,
}

impl Stage {
    pub fn new(id: i64, feature_id: i64, stage_type: i64) -> Self {
        Self {
            id,
            feature_id,
            stage_type,
            ..Default::default()
        }
    }

    pub fn provisioning_in_progress(&self) -> bool {
        self.ot_setup_status
            .map(|status| status.is_in_progress())
            .unwrap_or(false)
    }

    pub fn is_origin_trial(&self) -> bool {
        ALL_ORIGIN_TRIAL_STAGE_TYPES.contains(&self.stage_type)
    }
}
