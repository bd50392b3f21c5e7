//! Permission oracle consulted by handlers before reads and edits.

use crate::auth::Identity;
use crate::config::PermissionConfig;
use crate::database::models::FeatureEntry;

pub trait PermissionOracle: Send + Sync {
    fn can_view_feature(&self, identity: Option<&Identity>, feature: &FeatureEntry) -> bool;

    /// Site-wide edit rights over every feature
    fn can_edit_any_feature(&self, identity: &Identity) -> bool;

    fn can_edit_feature(&self, identity: &Identity, feature: &FeatureEntry) -> bool;

    fn can_admin_site(&self, identity: &Identity) -> bool;

    fn can_create_feature(&self, identity: &Identity) -> bool;

    /// Accounts of the kind that enterprise pages are restricted to
    fn is_restricted_account_kind(&self, identity: &Identity) -> bool;
}

/// Oracle backed by the static lists in `PermissionConfig`
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    admins: Vec<String>,
    editors: Vec<String>,
    creator_domains: Vec<String>,
    restricted_domains: Vec<String>,
}

impl StaticPermissions {
    pub fn new(config: &PermissionConfig) -> Self {
        Self {
            admins: lowered(&config.site_admins),
            editors: lowered(&config.site_editors),
            creator_domains: lowered(&config.creator_domains),
            restricted_domains: lowered(&config.restricted_account_domains),
        }
    }

    fn is_admin(&self, identity: &Identity) -> bool {
        self.admins.iter().any(|e| e == identity.email())
    }

    fn is_site_editor(&self, identity: &Identity) -> bool {
        self.is_admin(identity) || self.editors.iter().any(|e| e == identity.email())
    }
}

impl PermissionOracle for StaticPermissions {
    fn can_view_feature(&self, identity: Option<&Identity>, feature: &FeatureEntry) -> bool {
        if !feature.unlisted {
            return true;
        }
        identity.map_or(false, |id| self.can_edit_feature(id, feature))
    }

    fn can_edit_any_feature(&self, identity: &Identity) -> bool {
        self.is_site_editor(identity)
    }

    fn can_edit_feature(&self, identity: &Identity, feature: &FeatureEntry) -> bool {
        self.is_site_editor(identity) || feature.lists_editor(identity.email())
    }

    fn can_admin_site(&self, identity: &Identity) -> bool {
        self.is_admin(identity)
    }

    fn can_create_feature(&self, identity: &Identity) -> bool {
        self.is_site_editor(identity)
            || self.creator_domains.iter().any(|d| d == identity.domain())
    }

    fn is_restricted_account_kind(&self, identity: &Identity) -> bool {
        self.restricted_domains.iter().any(|d| d == identity.domain())
    }
}

fn lowered(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.trim().to_lowercase()).collect()
}
