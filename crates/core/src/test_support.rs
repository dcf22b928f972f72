//! Fixtures and store wrappers shared by the unit tests.

use crate::config::CoreConfig;
use crate::models::{
    Consultation, Entity, EntityKind, MedicalHistory, Patient, PatientSnapshot, PractitionerId,
    Prescription, Record, RecordFilter, RecordPatch, Relationship, Representative,
};
use crate::store::{EntityStore, EntityStoreExt, StoreError, StoreResult};
use chrono::{Duration, NaiveDate, Utc};
use medidesk_uuid::RecordId;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Mutex;

pub(crate) fn test_config() -> CoreConfig {
    CoreConfig::with_defaults(PathBuf::from("unused"))
}

/// Shape of a seeded patient and its dependents.
#[derive(Clone, Debug)]
pub(crate) struct PatientSeed {
    name: String,
    national_id: Option<String>,
    history: bool,
    consultations: usize,
    prescriptions: usize,
    representatives: usize,
    birth_date: Option<NaiveDate>,
    active: bool,
}

impl PatientSeed {
    pub(crate) fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            national_id: None,
            history: true,
            consultations: 0,
            prescriptions: 0,
            representatives: 0,
            birth_date: NaiveDate::from_ymd_opt(1985, 6, 1),
            active: true,
        }
    }

    pub(crate) fn national_id(mut self, national_id: &str) -> Self {
        self.national_id = Some(national_id.to_string());
        self
    }

    pub(crate) fn without_history(mut self) -> Self {
        self.history = false;
        self
    }

    pub(crate) fn consultations(mut self, n: usize) -> Self {
        self.consultations = n;
        self
    }

    pub(crate) fn prescriptions(mut self, n: usize) -> Self {
        self.prescriptions = n;
        self
    }

    pub(crate) fn representatives(mut self, n: usize) -> Self {
        self.representatives = n;
        self
    }

    pub(crate) fn born(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    /// Seeds every row with `active = false`, as a completed archive leaves them.
    pub(crate) fn archived(mut self) -> Self {
        self.active = false;
        self
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SeededPatient {
    pub(crate) patient: Patient,
    pub(crate) history: Option<MedicalHistory>,
    pub(crate) consultations: Vec<Consultation>,
    pub(crate) prescriptions: Vec<Prescription>,
    pub(crate) representatives: Vec<Representative>,
}

impl SeededPatient {
    pub(crate) fn history_id(&self) -> RecordId {
        self.history
            .as_ref()
            .map(|h| h.id)
            .expect("seeded patient has no medical history")
    }
}

/// Inserts a patient and its dependents directly through the store.
///
/// Rows get strictly increasing `created_at` values so "most recent first" is deterministic.
pub(crate) fn seed_patient<S: EntityStore + ?Sized>(
    store: &S,
    owner: PractitionerId,
    seed: PatientSeed,
) -> SeededPatient {
    let base = Utc::now() - Duration::minutes(10);
    let mut tick = 0;
    let mut next = || {
        tick += 1;
        base + Duration::milliseconds(tick)
    };
    let active = seed.active;

    let at = next();
    let patient = store
        .insert_as(Patient {
            id: RecordId::new(),
            owner_id: owner,
            full_name: seed.name.clone(),
            national_id: seed.national_id.clone(),
            email: Some("patient@example.com".into()),
            phone: Some("+34 600 000 000".into()),
            address: None,
            birth_date: seed.birth_date,
            active,
            created_at: at,
            updated_at: at,
        })
        .expect("seed patient");

    let history = seed.history.then(|| {
        let mut history = MedicalHistory::empty(owner, patient.id, None, next());
        history.active = active;
        store.insert_as(history).expect("seed history")
    });

    let mut consultations = Vec::new();
    let mut prescriptions = Vec::new();
    if let Some(history) = &history {
        for i in 0..seed.consultations {
            let at = next();
            consultations.push(
                store
                    .insert_as(Consultation {
                        id: RecordId::new(),
                        owner_id: owner,
                        medical_history_id: history.id,
                        date: at.date_naive(),
                        reason: format!("Visit {}", i + 1),
                        findings: None,
                        diagnosis: None,
                        vital_signs: Default::default(),
                        active,
                        created_at: at,
                        updated_at: at,
                    })
                    .expect("seed consultation"),
            );
        }
        for i in 0..seed.prescriptions {
            let at = next();
            prescriptions.push(
                store
                    .insert_as(Prescription {
                        id: RecordId::new(),
                        owner_id: owner,
                        medical_history_id: Some(history.id),
                        patient: patient.snapshot(),
                        date_prescribed: at.date_naive(),
                        diagnosis: Some("Pharyngitis".into()),
                        medications: format!("amoxicillin 500mg, course {}", i + 1),
                        instructions: Some("every 8 hours".into()),
                        notes: None,
                        active,
                        created_at: at,
                        updated_at: at,
                    })
                    .expect("seed prescription"),
            );
        }
    }

    let representatives = (0..seed.representatives)
        .map(|i| {
            let at = next();
            store
                .insert_as(Representative {
                    id: RecordId::new(),
                    owner_id: owner,
                    patient_id: patient.id,
                    full_name: format!("Representative {}", i + 1),
                    relationship: Relationship::Parent,
                    phone: None,
                    email: None,
                    primary: i == 0,
                    active,
                    created_at: at,
                    updated_at: at,
                })
                .expect("seed representative")
        })
        .collect();

    SeededPatient {
        patient,
        history,
        consultations,
        prescriptions,
        representatives,
    }
}

pub(crate) fn seed_detached_prescription<S: EntityStore + ?Sized>(
    store: &S,
    owner: PractitionerId,
    patient_name: &str,
) -> Prescription {
    let now = Utc::now();
    store
        .insert_as(Prescription {
            id: RecordId::new(),
            owner_id: owner,
            medical_history_id: None,
            patient: PatientSnapshot {
                name: patient_name.to_string(),
                ..Default::default()
            },
            date_prescribed: now.date_naive(),
            diagnosis: None,
            medications: "ibuprofen 400mg".into(),
            instructions: None,
            notes: None,
            active: true,
            created_at: now,
            updated_at: now,
        })
        .expect("seed detached prescription")
}

/// Delegating store that fails chosen writes.
pub(crate) struct FlakyStore<'a, S: ?Sized> {
    inner: &'a S,
    failing_updates: BTreeSet<RecordId>,
    failing_inserts: BTreeSet<EntityKind>,
}

impl<'a, S: EntityStore + ?Sized> FlakyStore<'a, S> {
    pub(crate) fn new(inner: &'a S) -> Self {
        Self {
            inner,
            failing_updates: BTreeSet::new(),
            failing_inserts: BTreeSet::new(),
        }
    }

    pub(crate) fn fail_updates_of(mut self, id: RecordId) -> Self {
        self.failing_updates.insert(id);
        self
    }

    pub(crate) fn fail_inserts_of(mut self, kind: EntityKind) -> Self {
        self.failing_inserts.insert(kind);
        self
    }
}

impl<S: EntityStore + ?Sized> EntityStore for FlakyStore<'_, S> {
    fn get(&self, kind: EntityKind, id: &RecordId) -> StoreResult<Option<Record>> {
        self.inner.get(kind, id)
    }

    fn find(&self, kind: EntityKind, filter: &RecordFilter) -> StoreResult<Vec<Record>> {
        self.inner.find(kind, filter)
    }

    fn update(&self, kind: EntityKind, id: &RecordId, patch: &RecordPatch) -> StoreResult<Record> {
        if self.failing_updates.contains(id) {
            return Err(StoreError::Unavailable(format!("injected failure updating {kind} {id}")));
        }
        self.inner.update(kind, id, patch)
    }

    fn insert(&self, record: Record) -> StoreResult<Record> {
        if self.failing_inserts.contains(&record.kind()) {
            return Err(StoreError::Unavailable(format!(
                "injected failure inserting {}",
                record.kind()
            )));
        }
        self.inner.insert(record)
    }

    fn delete(&self, kind: EntityKind, id: &RecordId) -> StoreResult<()> {
        self.inner.delete(kind, id)
    }
}

/// Delegating store that checks, after every update, that no active row hangs off an
/// archived parent.
pub(crate) struct AuditingStore<'a, S: ?Sized> {
    inner: &'a S,
    writes: Mutex<usize>,
    violations: Mutex<Vec<String>>,
}

impl<'a, S: EntityStore + ?Sized> AuditingStore<'a, S> {
    pub(crate) fn new(inner: &'a S) -> Self {
        Self {
            inner,
            writes: Mutex::new(0),
            violations: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub(crate) fn violations(&self) -> Vec<String> {
        self.violations.lock().unwrap().clone()
    }

    fn audit(&self) {
        let mut rows: BTreeMap<RecordId, Record> = BTreeMap::new();
        for kind in EntityKind::ALL {
            for record in self.inner.find(kind, &RecordFilter::any()).unwrap() {
                rows.insert(record.id(), record);
            }
        }

        let mut violations = self.violations.lock().unwrap();
        for record in rows.values().filter(|r| r.is_active()) {
            let parent = record.patient_id().or(record.medical_history_id());
            if let Some(parent) = parent.and_then(|id| rows.get(&id)) {
                if !parent.is_active() {
                    violations.push(format!(
                        "active {} {} under archived {} {}",
                        record.kind(),
                        record.id(),
                        parent.kind(),
                        parent.id()
                    ));
                }
            }
        }
    }
}

impl<S: EntityStore + ?Sized> EntityStore for AuditingStore<'_, S> {
    fn get(&self, kind: EntityKind, id: &RecordId) -> StoreResult<Option<Record>> {
        self.inner.get(kind, id)
    }

    fn find(&self, kind: EntityKind, filter: &RecordFilter) -> StoreResult<Vec<Record>> {
        self.inner.find(kind, filter)
    }

    fn update(&self, kind: EntityKind, id: &RecordId, patch: &RecordPatch) -> StoreResult<Record> {
        let updated = self.inner.update(kind, id, patch)?;
        *self.writes.lock().unwrap() += 1;
        self.audit();
        Ok(updated)
    }

    fn insert(&self, record: Record) -> StoreResult<Record> {
        self.inner.insert(record)
    }

    fn delete(&self, kind: EntityKind, id: &RecordId) -> StoreResult<()> {
        self.inner.delete(kind, id)
    }
}

/// Reads a typed row back, panicking when it is missing.
pub(crate) fn reload<T: Entity, S: EntityStore + ?Sized>(store: &S, id: &RecordId) -> T {
    store
        .get_as::<T>(id)
        .expect("store read")
        .expect("row should exist")
}
