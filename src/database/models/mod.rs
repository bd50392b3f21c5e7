pub mod feature;
pub mod stage;

pub use feature::FeatureEntry;
pub use stage::{MilestoneSet, OtSetupStatus, Stage};
