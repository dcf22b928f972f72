//! In-process store backed by ordered maps.

use super::{check_national_id_unique, sort_most_recent_first, EntityStore, StoreError, StoreResult};
use crate::models::{EntityKind, Record, RecordFilter, RecordPatch};
use chrono::Utc;
use medidesk_uuid::RecordId;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Each call takes the lock once, so every operation is atomic per row and calls from
/// different threads are serialised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<(EntityKind, RecordId), Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows held for `kind`, regardless of their `active` flag.
    pub fn count(&self, kind: EntityKind) -> StoreResult<usize> {
        Ok(self.lock()?.keys().filter(|(k, _)| *k == kind).count())
    }

    /// Every row in key order. Used to assert that an operation left the store untouched.
    pub fn snapshot(&self) -> StoreResult<Vec<Record>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BTreeMap<(EntityKind, RecordId), Record>>> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl EntityStore for MemoryStore {
    fn get(&self, kind: EntityKind, id: &RecordId) -> StoreResult<Option<Record>> {
        Ok(self.lock()?.get(&(kind, *id)).cloned())
    }

    fn find(&self, kind: EntityKind, filter: &RecordFilter) -> StoreResult<Vec<Record>> {
        let rows = self.lock()?;
        let mut found: Vec<Record> = rows
            .iter()
            .filter(|((k, _), record)| *k == kind && filter.matches(record))
            .map(|(_, record)| record.clone())
            .collect();
        sort_most_recent_first(&mut found);
        Ok(found)
    }

    fn update(&self, kind: EntityKind, id: &RecordId, patch: &RecordPatch) -> StoreResult<Record> {
        let mut rows = self.lock()?;
        let record = rows
            .get_mut(&(kind, *id))
            .ok_or(StoreError::NotFound { kind, id: *id })?;

        let mut updated = record.clone();
        updated.apply(patch, Utc::now())?;
        *record = updated.clone();
        Ok(updated)
    }

    fn insert(&self, record: Record) -> StoreResult<Record> {
        let mut rows = self.lock()?;
        let key = (record.kind(), record.id());
        if rows.contains_key(&key) {
            return Err(StoreError::UniqueViolation {
                kind: key.0,
                field: "id",
            });
        }

        check_national_id_unique(&record, rows.values())?;

        rows.insert(key, record.clone());
        Ok(record)
    }

    fn delete(&self, kind: EntityKind, id: &RecordId) -> StoreResult<()> {
        self.lock()?
            .remove(&(kind, *id))
            .map(|_| ())
            .ok_or(StoreError::NotFound { kind, id: *id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, PractitionerId};
    use crate::store::EntityStoreExt;
    use chrono::Duration;

    fn patient(owner: PractitionerId, name: &str, national_id: Option<&str>) -> Patient {
        let now = Utc::now();
        Patient {
            id: RecordId::new(),
            owner_id: owner,
            full_name: name.into(),
            national_id: national_id.map(str::to_string),
            email: None,
            phone: None,
            address: None,
            birth_date: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_rejects_duplicate_national_id_for_same_owner() {
        let store = MemoryStore::new();
        let owner = PractitionerId::new();
        store
            .insert_as(patient(owner, "Ana López", Some("12345678A")))
            .expect("first insert should succeed");

        let err = store
            .insert_as(patient(owner, "Ana Copy", Some("12345678A")))
            .expect_err("duplicate national id should fail");
        assert!(matches!(
            err,
            StoreError::UniqueViolation {
                field: "national_id",
                ..
            }
        ));

        // Another practitioner may register the same person.
        store
            .insert_as(patient(PractitionerId::new(), "Ana López", Some("12345678A")))
            .expect("other owner should not clash");
    }

    #[test]
    fn patients_without_national_id_never_clash() {
        let store = MemoryStore::new();
        let owner = PractitionerId::new();
        store.insert_as(patient(owner, "One", None)).unwrap();
        store.insert_as(patient(owner, "Two", None)).unwrap();
        assert_eq!(store.count(EntityKind::Patient).unwrap(), 2);
    }

    #[test]
    fn find_orders_most_recent_first() {
        let store = MemoryStore::new();
        let owner = PractitionerId::new();
        let mut older = patient(owner, "Older", None);
        older.created_at = Utc::now() - Duration::days(2);
        let newer = patient(owner, "Newer", None);
        store.insert_as(older).unwrap();
        store.insert_as(newer).unwrap();

        let found: Vec<Patient> = store.find_as(&RecordFilter::owned_by(owner)).unwrap();
        let names: Vec<_> = found.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, vec!["Newer", "Older"]);
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let store = MemoryStore::new();
        let id = RecordId::new();

        assert!(matches!(
            store.update(EntityKind::Patient, &id, &RecordPatch::set_active(false)),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete(EntityKind::Patient, &id),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn rejected_patch_leaves_row_unchanged() {
        let store = MemoryStore::new();
        let stored = store
            .insert_as(patient(PractitionerId::new(), "Ana", None))
            .unwrap();

        let err = store
            .update(EntityKind::Patient, &stored.id, &RecordPatch::set_primary(true))
            .expect_err("primary does not apply to patients");
        assert!(matches!(err, StoreError::InvalidPatch(_)));

        let reloaded: Patient = store.get_as(&stored.id).unwrap().unwrap();
        assert_eq!(reloaded, stored);
    }
}
