pub mod models;
pub mod store;

pub use models::{FeatureEntry, MilestoneSet, OtSetupStatus, Stage};
pub use store::{Entity, EntityKind, EntityStore, MemoryStore, StoreError, StoredEntity};
