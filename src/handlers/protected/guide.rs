// handlers/protected/guide.rs - /guide/edit/:feature_id form page

use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::handlers::base::BaseHandler;
use crate::handlers::page::{EndpointResult, PageDefaults, PageEndpoint, SPA_TEMPLATE};
use crate::types::Verb;
use crate::updates::fields::Delimiter;
use crate::updates::{ChangeRequest, ChangeSet};

const TEXT_FIELDS: [&str; 3] = ["name", "summary", "motivation"];
const EMAIL_FIELDS: [&str; 3] = ["owner_emails", "editor_emails", "cc_emails"];
const LINK_FIELDS: [&str; 2] = ["spec_link", "bug_url"];
const LINKS_FIELDS: [&str; 3] = ["doc_links", "sample_links", "screenshot_links"];

/// GET renders the editor shell; POST applies a classic form submission
pub struct GuideEditPage {
    defaults: PageDefaults,
}

impl GuideEditPage {
    pub fn new(defaults: PageDefaults) -> Self {
        Self { defaults }
    }

    /// Parsed form fields as a change request; fields missing from the form are left alone
    fn form_changes(&self, handler: &BaseHandler<'_>) -> Result<ChangeRequest, ApiError> {
        let form = &handler.ctx.form;
        let mut entries = Map::new();
        let mut put = |field: &str, value: Value| {
            entries.insert(
                field.to_string(),
                json!({"form_field_name": field, "value": value}),
            );
        };

        for field in TEXT_FIELDS.into_iter().filter(|f| form.contains_key(*f)) {
            put(field, json!(handler.ctx.form_field(field).unwrap_or_default().trim()));
        }
        for field in EMAIL_FIELDS.into_iter().filter(|f| form.contains_key(*f)) {
            put(field, json!(handler.split_emails(field)));
        }
        for field in LINK_FIELDS.into_iter().filter(|f| form.contains_key(*f)) {
            put(field, json!(handler.parse_link(field).unwrap_or_default()));
        }
        for field in LINKS_FIELDS.into_iter().filter(|f| form.contains_key(*f)) {
            put(field, json!(handler.parse_links(field)));
        }
        if form.contains_key("search_tags") {
            put("search_tags", json!(handler.split_input("search_tags", Delimiter::Comma)));
        }
        if form.contains_key("category") {
            put(
                "category",
                handler.parse_int("category")?.map(Value::from).unwrap_or_else(|| json!("")),
            );
        }
        if form.contains_key("blink_components") {
            put(
                "blink_components",
                json!(handler.split_input("blink_components", Delimiter::Comma)),
            );
        }

        Ok(ChangeRequest::new(entries))
    }
}

impl PageEndpoint for GuideEditPage {
    fn supported_verbs(&self) -> &'static [Verb] {
        &[Verb::Post]
    }

    fn template_path(&self) -> Option<&str> {
        Some(SPA_TEMPLATE)
    }

    fn get_template_data(&self, handler: &BaseHandler<'_>) -> Result<EndpointResult, ApiError> {
        Ok(self
            .defaults
            .check(handler)?
            .unwrap_or_else(EndpointResult::empty_template))
    }

    fn process_post_data(&self, handler: &BaseHandler<'_>) -> Result<EndpointResult, ApiError> {
        let feature_id = handler.path_int("feature_id")?;
        let mut feature = handler.get_editable_feature(feature_id)?;

        let changes = self.form_changes(handler)?;
        let mut changed = ChangeSet::new();
        handler
            .updater()
            .update_feature(&mut feature, &changes, &mut changed)?;
        tracing::info!("Guide edit of feature {} changed {} fields", feature_id, changed.len());

        Ok(EndpointResult::redirect(format!("/feature/{}", feature_id)))
    }
}
