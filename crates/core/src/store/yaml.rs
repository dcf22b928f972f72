//! File-backed store: one YAML document per record.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   patients/
//!     <s1>/
//!       <s2>/
//!         <id>/
//!           record.yaml
//!   representatives/ ...
//!   medical_histories/ ...
//!   consultations/ ...
//!   prescriptions/ ...
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the record id. Queries walk the
//! whole collection, so this backend suits a single practice rather than a hosted service.

use super::{check_national_id_unique, sort_most_recent_first, EntityStore, StoreError, StoreResult};
use crate::constants::RECORD_FILENAME;
use crate::models::{EntityKind, Record, RecordFilter, RecordPatch};
use chrono::Utc;
use medidesk_uuid::RecordId;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct YamlStore {
    data_dir: PathBuf,
}

impl YamlStore {
    /// Opens a store rooted at `data_dir`, creating the directory if needed.
    pub fn open(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn collection_dir(&self, kind: EntityKind) -> PathBuf {
        self.data_dir.join(kind.collection())
    }

    fn record_dir(&self, kind: EntityKind, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.collection_dir(kind))
    }

    fn record_path(&self, kind: EntityKind, id: &RecordId) -> PathBuf {
        self.record_dir(kind, id).join(RECORD_FILENAME)
    }

    fn read(&self, kind: EntityKind, path: &Path) -> StoreResult<Option<Record>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        parse_record(kind, &contents).map(Some)
    }

    fn write(&self, record: &Record) -> StoreResult<()> {
        let dir = self.record_dir(record.kind(), &record.id());
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(RECORD_FILENAME), render_record(record)?)?;
        Ok(())
    }

    /// Reads every parseable record of a collection. Unreadable files are logged and skipped.
    fn scan(&self, kind: EntityKind) -> StoreResult<Vec<Record>> {
        let mut records = Vec::new();

        let s1_iter = match fs::read_dir(self.collection_dir(kind)) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(StoreError::Io(e)),
        };

        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }

            let Ok(s2_iter) = fs::read_dir(&s1_path) else {
                continue;
            };
            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }

                let Ok(id_iter) = fs::read_dir(&s2_path) else {
                    continue;
                };
                for id_ent in id_iter.flatten() {
                    let record_path = id_ent.path().join(RECORD_FILENAME);
                    if !record_path.is_file() {
                        continue;
                    }

                    match self.read(kind, &record_path) {
                        Ok(Some(record)) => records.push(record),
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(
                                "skipping unreadable {} record: {} - {}",
                                kind,
                                record_path.display(),
                                e
                            );
                        }
                    }
                }
            }
        }

        Ok(records)
    }
}

impl EntityStore for YamlStore {
    fn get(&self, kind: EntityKind, id: &RecordId) -> StoreResult<Option<Record>> {
        self.read(kind, &self.record_path(kind, id))
    }

    fn find(&self, kind: EntityKind, filter: &RecordFilter) -> StoreResult<Vec<Record>> {
        let mut found: Vec<Record> = self
            .scan(kind)?
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect();
        sort_most_recent_first(&mut found);
        Ok(found)
    }

    fn update(&self, kind: EntityKind, id: &RecordId, patch: &RecordPatch) -> StoreResult<Record> {
        let mut record = self
            .get(kind, id)?
            .ok_or(StoreError::NotFound { kind, id: *id })?;
        record.apply(patch, Utc::now())?;
        self.write(&record)?;
        Ok(record)
    }

    fn insert(&self, record: Record) -> StoreResult<Record> {
        let kind = record.kind();
        if self.record_path(kind, &record.id()).exists() {
            return Err(StoreError::UniqueViolation { kind, field: "id" });
        }

        if kind == EntityKind::Patient {
            let existing = self.scan(EntityKind::Patient)?;
            check_national_id_unique(&record, existing.iter())?;
        }

        self.write(&record)?;
        Ok(record)
    }

    fn delete(&self, kind: EntityKind, id: &RecordId) -> StoreResult<()> {
        let dir = self.record_dir(kind, id);
        if !dir.join(RECORD_FILENAME).is_file() {
            return Err(StoreError::NotFound { kind, id: *id });
        }
        fs::remove_dir_all(dir)?;
        Ok(())
    }
}

fn render_record(record: &Record) -> StoreResult<String> {
    let rendered = match record {
        Record::Patient(r) => serde_yaml::to_string(r),
        Record::Representative(r) => serde_yaml::to_string(r),
        Record::MedicalHistory(r) => serde_yaml::to_string(r),
        Record::Consultation(r) => serde_yaml::to_string(r),
        Record::Prescription(r) => serde_yaml::to_string(r),
    };
    rendered.map_err(StoreError::YamlSerialization)
}

fn parse_record(kind: EntityKind, contents: &str) -> StoreResult<Record> {
    let parsed = match kind {
        EntityKind::Patient => serde_yaml::from_str(contents).map(Record::Patient),
        EntityKind::Representative => serde_yaml::from_str(contents).map(Record::Representative),
        EntityKind::MedicalHistory => serde_yaml::from_str(contents).map(Record::MedicalHistory),
        EntityKind::Consultation => serde_yaml::from_str(contents).map(Record::Consultation),
        EntityKind::Prescription => serde_yaml::from_str(contents).map(Record::Prescription),
    };
    parsed.map_err(StoreError::YamlDeserialization)
}
