//! Entity Store: the persistence seam of the lifecycle manager.
//!
//! The store is a plain per-row repository. It knows nothing about cascades or ownership rules;
//! it only offers lookup, filtered queries, single-row updates, inserts and deletes. All
//! multi-row consistency lives in the lifecycle engine, which talks to the store one row at a
//! time.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`]: in-process maps, used by tests and demos.
//! - [`YamlStore`]: one YAML file per record in a sharded directory tree.

mod memory;
mod yaml;

pub use memory::MemoryStore;
pub use yaml::YamlStore;

use crate::models::{Entity, EntityKind, InvalidPatch, Record, RecordFilter, RecordPatch};
use medidesk_uuid::RecordId;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} does not exist")]
    NotFound { kind: EntityKind, id: RecordId },
    #[error("{kind} {field} must be unique")]
    UniqueViolation {
        kind: EntityKind,
        field: &'static str,
    },
    #[error("invalid patch: {0}")]
    InvalidPatch(#[from] InvalidPatch),
    #[error("stored record is invalid: {0}")]
    InvalidRecord(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize record: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize record: {0}")]
    YamlDeserialization(serde_yaml::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Row-level persistence for every entity collection.
///
/// `find` returns rows most recent first (by `created_at`, ties broken by id). Each call is an
/// independent round-trip; there is no multi-row transaction.
pub trait EntityStore: Send + Sync {
    fn get(&self, kind: EntityKind, id: &RecordId) -> StoreResult<Option<Record>>;

    fn find(&self, kind: EntityKind, filter: &RecordFilter) -> StoreResult<Vec<Record>>;

    /// Applies `patch` to one row and returns the updated row.
    fn update(&self, kind: EntityKind, id: &RecordId, patch: &RecordPatch) -> StoreResult<Record>;

    fn insert(&self, record: Record) -> StoreResult<Record>;

    fn delete(&self, kind: EntityKind, id: &RecordId) -> StoreResult<()>;
}

impl<S: EntityStore + ?Sized> EntityStore for Arc<S> {
    fn get(&self, kind: EntityKind, id: &RecordId) -> StoreResult<Option<Record>> {
        (**self).get(kind, id)
    }

    fn find(&self, kind: EntityKind, filter: &RecordFilter) -> StoreResult<Vec<Record>> {
        (**self).find(kind, filter)
    }

    fn update(&self, kind: EntityKind, id: &RecordId, patch: &RecordPatch) -> StoreResult<Record> {
        (**self).update(kind, id, patch)
    }

    fn insert(&self, record: Record) -> StoreResult<Record> {
        (**self).insert(record)
    }

    fn delete(&self, kind: EntityKind, id: &RecordId) -> StoreResult<()> {
        (**self).delete(kind, id)
    }
}

/// Typed helpers over [`EntityStore`].
pub trait EntityStoreExt: EntityStore {
    fn get_as<T: Entity>(&self, id: &RecordId) -> StoreResult<Option<T>> {
        self.get(T::KIND, id)?.map(expect_kind::<T>).transpose()
    }

    fn find_as<T: Entity>(&self, filter: &RecordFilter) -> StoreResult<Vec<T>> {
        self.find(T::KIND, filter)?
            .into_iter()
            .map(expect_kind::<T>)
            .collect()
    }

    fn insert_as<T: Entity>(&self, entity: T) -> StoreResult<T> {
        self.insert(entity.into_record()).and_then(expect_kind::<T>)
    }

    fn update_as<T: Entity>(&self, id: &RecordId, patch: &RecordPatch) -> StoreResult<T> {
        self.update(T::KIND, id, patch).and_then(expect_kind::<T>)
    }
}

impl<S: EntityStore + ?Sized> EntityStoreExt for S {}

fn expect_kind<T: Entity>(record: Record) -> StoreResult<T> {
    let found = record.kind();
    T::from_record(record).ok_or_else(|| {
        StoreError::InvalidRecord(format!("expected a {}, found a {found}", T::KIND))
    })
}

/// Orders rows most recent first, the order list views expect.
pub(crate) fn sort_most_recent_first(records: &mut [Record]) {
    records.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
}

/// National ids are unique per practitioner; returns the violation if `candidate` clashes with
/// one of `existing`.
pub(crate) fn check_national_id_unique<'a>(
    candidate: &Record,
    existing: impl IntoIterator<Item = &'a Record>,
) -> StoreResult<()> {
    let Record::Patient(patient) = candidate else {
        return Ok(());
    };
    let Some(national_id) = patient.national_id.as_deref() else {
        return Ok(());
    };

    let clash = existing.into_iter().any(|other| match other {
        Record::Patient(p) => {
            p.id != patient.id
                && p.owner_id == patient.owner_id
                && p.national_id.as_deref() == Some(national_id)
        }
        _ => false,
    });

    if clash {
        return Err(StoreError::UniqueViolation {
            kind: EntityKind::Patient,
            field: "national_id",
        });
    }
    Ok(())
}
