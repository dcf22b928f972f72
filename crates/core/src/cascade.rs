//! Cascade resolution.
//!
//! Foreign keys only point from child to parent, so the set of rows that must change together
//! with a root entity is computed here by walking them backwards:
//!
//! ```text
//! Patient
//!   ├── Representative*        (patient_id)
//!   └── MedicalHistory?        (patient_id)
//!         ├── Consultation*    (medical_history_id)
//!         └── Prescription*    (medical_history_id)
//! ```
//!
//! A prescription root pulls in its patient only when that patient is archived. Restoring such
//! a prescription means restoring the whole patient, which callers confirm first.

use crate::lifecycle::Direction;
use crate::models::{
    Consultation, EntityKind, MedicalHistory, Patient, PractitionerId, Prescription, Record,
    RecordFilter, Representative,
};
use crate::ownership::OwnershipVerifier;
use crate::store::{EntityStore, EntityStoreExt};
use crate::PracticeResult;
use medidesk_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The entity kinds a lifecycle operation can be invoked on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    Patient,
    Prescription,
}

impl RootKind {
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            RootKind::Patient => EntityKind::Patient,
            RootKind::Prescription => EntityKind::Prescription,
        }
    }
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.entity_kind(), f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CascadeRoot {
    pub kind: RootKind,
    pub id: RecordId,
}

impl CascadeRoot {
    pub fn patient(id: RecordId) -> Self {
        Self {
            kind: RootKind::Patient,
            id,
        }
    }

    pub fn prescription(id: RecordId) -> Self {
        Self {
            kind: RootKind::Prescription,
            id,
        }
    }

    fn is(&self, kind: EntityKind, id: RecordId) -> bool {
        self.kind.entity_kind() == kind && self.id == id
    }
}

/// One row of a cascade, in the state it had when the cascade was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CascadeStep {
    pub kind: EntityKind,
    pub id: RecordId,
    pub active: bool,
    pub is_root: bool,
}

/// Every row that transitions together with a root entity.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeSet {
    pub root: CascadeRoot,
    pub patient: Option<Patient>,
    pub medical_history: Option<MedicalHistory>,
    pub consultations: Vec<Consultation>,
    pub prescriptions: Vec<Prescription>,
    pub representatives: Vec<Representative>,
}

impl CascadeSet {
    /// Whether a prescription root was widened to its (archived) patient. Always true for
    /// patient roots.
    pub fn includes_patient(&self) -> bool {
        self.patient.is_some()
    }

    /// Number of rows in the set, root included.
    pub fn len(&self) -> usize {
        usize::from(self.patient.is_some())
            + usize::from(self.medical_history.is_some())
            + self.consultations.len()
            + self.prescriptions.len()
            + self.representatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short human label for notices, e.g. `patient Ana López`.
    pub fn label(&self) -> String {
        match (self.root.kind, &self.patient) {
            (RootKind::Patient, Some(patient)) => format!("patient {}", patient.full_name),
            (RootKind::Prescription, _) => match self.root_prescription() {
                Some(rx) => format!("prescription for {}", rx.patient.name),
                None => "prescription".to_string(),
            },
            (RootKind::Patient, None) => "patient".to_string(),
        }
    }

    pub fn root_prescription(&self) -> Option<&Prescription> {
        self.prescriptions.iter().find(|rx| rx.id == self.root.id)
    }

    /// The rows of the set in the order the lifecycle engine must write them.
    ///
    /// Archive goes children first so an interrupted run never leaves an active child under an
    /// archived parent; restore goes parents first for the same reason.
    pub fn ordered_steps(&self, direction: Direction) -> Vec<CascadeStep> {
        let patient = self
            .patient
            .iter()
            .map(|p| self.step(EntityKind::Patient, p.id, p.active));
        let history = self
            .medical_history
            .iter()
            .map(|h| self.step(EntityKind::MedicalHistory, h.id, h.active));
        let consultations = self
            .consultations
            .iter()
            .map(|c| self.step(EntityKind::Consultation, c.id, c.active));
        let prescriptions = self
            .prescriptions
            .iter()
            .map(|rx| self.step(EntityKind::Prescription, rx.id, rx.active));
        let representatives = self
            .representatives
            .iter()
            .map(|r| self.step(EntityKind::Representative, r.id, r.active));

        match direction {
            Direction::Archive => consultations
                .chain(prescriptions)
                .chain(history)
                .chain(representatives)
                .chain(patient)
                .collect(),
            Direction::Restore => patient
                .chain(history)
                .chain(consultations)
                .chain(prescriptions)
                .chain(representatives)
                .collect(),
        }
    }

    fn step(&self, kind: EntityKind, id: RecordId, active: bool) -> CascadeStep {
        CascadeStep {
            kind,
            id,
            active,
            is_root: self.root.is(kind, id),
        }
    }
}

/// Computes cascade sets. Never writes.
pub struct CascadeResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> CascadeResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Verifies ownership of the root and resolves its cascade.
    ///
    /// # Errors
    ///
    /// [`crate::PracticeError::NotFound`] when the root is missing or owned by someone else.
    pub fn resolve(&self, root: CascadeRoot, owner_id: PractitionerId) -> PracticeResult<CascadeSet> {
        let verifier = OwnershipVerifier::new(self.store);
        match root.kind {
            RootKind::Patient => {
                let patient: Patient = verifier.authorize(&root.id, owner_id)?;
                self.resolve_patient(patient)
            }
            RootKind::Prescription => {
                let prescription: Prescription = verifier.authorize(&root.id, owner_id)?;
                self.resolve_prescription(prescription)
            }
        }
    }

    /// Resolves the full set under an already authorized patient.
    pub fn resolve_patient(&self, patient: Patient) -> PracticeResult<CascadeSet> {
        let owner_id = patient.owner_id;

        let mut histories: Vec<MedicalHistory> = self
            .store
            .find_as(&RecordFilter::for_patient(patient.id).owner(owner_id))?;
        if histories.len() > 1 {
            tracing::warn!(
                "patient {} has {} medical histories; cascading the most recent only",
                patient.id,
                histories.len()
            );
        }
        let medical_history = if histories.is_empty() {
            None
        } else {
            Some(histories.swap_remove(0))
        };

        let (consultations, prescriptions): (Vec<Consultation>, Vec<Prescription>) =
            match &medical_history {
                Some(history) => {
                    let filter = RecordFilter::for_medical_history(history.id).owner(owner_id);
                    (self.store.find_as(&filter)?, self.store.find_as(&filter)?)
                }
                None => (Vec::new(), Vec::new()),
            };

        let representatives: Vec<Representative> = self
            .store
            .find_as(&RecordFilter::for_patient(patient.id).owner(owner_id))?;

        Ok(CascadeSet {
            root: CascadeRoot::patient(patient.id),
            patient: Some(patient),
            medical_history,
            consultations,
            prescriptions,
            representatives,
        })
    }

    /// Resolves the set for an already authorized prescription.
    ///
    /// Linked prescriptions whose patient is archived re-enter patient resolution; every other
    /// prescription stands alone.
    pub fn resolve_prescription(&self, prescription: Prescription) -> PracticeResult<CascadeSet> {
        let root = CascadeRoot::prescription(prescription.id);

        if let Some(patient) = self.archived_patient_of(&prescription)? {
            let mut set = self.resolve_patient(patient)?;
            set.root = root;
            if !set.prescriptions.iter().any(|rx| rx.id == prescription.id) {
                set.prescriptions.push(prescription);
            }
            return Ok(set);
        }

        Ok(CascadeSet {
            root,
            patient: None,
            medical_history: None,
            consultations: Vec::new(),
            prescriptions: vec![prescription],
            representatives: Vec::new(),
        })
    }

    fn archived_patient_of(&self, prescription: &Prescription) -> PracticeResult<Option<Patient>> {
        let Some(history_id) = prescription.medical_history_id else {
            return Ok(None);
        };

        let history = match self.store.get(EntityKind::MedicalHistory, &history_id)? {
            Some(Record::MedicalHistory(h)) if h.owner_id == prescription.owner_id => h,
            _ => {
                tracing::warn!(
                    "prescription {} references missing medical history {}; treating it as detached",
                    prescription.id,
                    history_id
                );
                return Ok(None);
            }
        };

        let patient = match self.store.get(EntityKind::Patient, &history.patient_id)? {
            Some(Record::Patient(p)) if p.owner_id == prescription.owner_id => p,
            _ => {
                tracing::warn!(
                    "medical history {} references missing patient {}",
                    history.id,
                    history.patient_id
                );
                return Ok(None);
            }
        };

        Ok((!patient.active).then_some(patient))
    }
}
