// updates/mod.rs - Schema-driven partial updates of features and stages

pub mod engine;
pub mod fields;
pub mod schema;

pub use engine::{ChangeEntry, ChangeRequest, ChangeSet, EntityUpdater, FieldChange};
pub use fields::{FieldError, FieldType, FieldValue};
