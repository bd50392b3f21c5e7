use serde::{Deserialize, Serialize};

/// A tracked web platform feature. Only the fields the edit surface touches are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureEntry {
    pub id: i64,
    pub name: String,
    pub summary: String,
    pub category: Option<i64>,
    pub owner_emails: Vec<String>,
    pub editor_emails: Vec<String>,
    pub cc_emails: Vec<String>,
    pub blink_components: Vec<String>,
    pub search_tags: Vec<String>,
    pub spec_link: Option<String>,
    pub bug_url: Option<String>,
    pub doc_links: Vec<String>,
    pub sample_links: Vec<String>,
    pub screenshot_links: Vec<String>,
    pub motivation: Option<String>,
    pub unlisted: bool,
    pub breaking_change: bool,
}

impl FeatureEntry {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Owners and editors listed on the feature itself
    pub fn lists_editor(&self, email: &str) -> bool {
        self.owner_emails
            .iter()
            .chain(self.editor_emails.iter())
            .any(|e| e.eq_ignore_ascii_case(email))
    }
}
