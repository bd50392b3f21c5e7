use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use thiserror::Error;

use super::models::{FeatureEntry, Stage};

/// Errors from an EntityStore backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Feature,
    Stage,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Feature => f.write_str("Feature"),
            EntityKind::Stage => f.write_str("Stage"),
        }
    }
}

/// Any record the store knows how to hold
#[derive(Debug, Clone, PartialEq)]
pub enum StoredEntity {
    Feature(FeatureEntry),
    Stage(Stage),
}

impl StoredEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            StoredEntity::Feature(_) => EntityKind::Feature,
            StoredEntity::Stage(_) => EntityKind::Stage,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            StoredEntity::Feature(f) => f.id,
            StoredEntity::Stage(s) => s.id,
        }
    }
}

/// A concrete record type addressable by `(KIND, id)`
pub trait Entity: Clone + Send + Sized + 'static {
    const KIND: EntityKind;

    fn id(&self) -> i64;
    fn from_stored(stored: StoredEntity) -> Option<Self>;
    fn into_stored(self) -> StoredEntity;
}

impl Entity for FeatureEntry {
    const KIND: EntityKind = EntityKind::Feature;

    fn id(&self) -> i64 {
        self.id
    }

    fn from_stored(stored: StoredEntity) -> Option<Self> {
        match stored {
            StoredEntity::Feature(f) => Some(f),
            _ => None,
        }
    }

    fn into_stored(self) -> StoredEntity {
        StoredEntity::Feature(self)
    }
}

impl Entity for Stage {
    const KIND: EntityKind = EntityKind::Stage;

    fn id(&self) -> i64 {
        self.id
    }

    fn from_stored(stored: StoredEntity) -> Option<Self> {
        match stored {
            StoredEntity::Stage(s) => Some(s),
            _ => None,
        }
    }

    fn into_stored(self) -> StoredEntity {
        StoredEntity::Stage(self)
    }
}

/// Storage collaborator. Calls block; there is no isolation between a fetch and a later persist.
pub trait EntityStore: Send + Sync {
    fn fetch_by_id(&self, kind: EntityKind, id: i64) -> Result<Option<StoredEntity>, StoreError>;

    fn persist(&self, entity: StoredEntity) -> Result<(), StoreError>;
}

impl<'a> dyn EntityStore + 'a {
    /// Typed fetch; a record of another kind under the same id counts as absent
    pub fn fetch<E: Entity>(&self, id: i64) -> Result<Option<E>, StoreError> {
        Ok(self.fetch_by_id(E::KIND, id)?.and_then(E::from_stored))
    }

    pub fn put<E: Entity>(&self, entity: E) -> Result<(), StoreError> {
        self.persist(entity.into_stored())
    }
}

/// Process-local store used by the dev server and the test suite
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(EntityKind, i64), StoredEntity>>,
    persist_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without counting it as a persist call
    pub fn insert(&self, entity: impl Entity) -> Result<(), StoreError> {
        let stored = entity.into_stored();
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.insert((stored.kind(), stored.id()), stored);
        Ok(())
    }

    pub fn persist_count(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityStore for MemoryStore {
    fn fetch_by_id(&self, kind: EntityKind, id: i64) -> Result<Option<StoredEntity>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(&(kind, id)).cloned())
    }

    fn persist(&self, entity: StoredEntity) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        tracing::debug!("Persisting {} {}", entity.kind(), entity.id());
        records.insert((entity.kind(), entity.id()), entity);
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
