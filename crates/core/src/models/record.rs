use super::{
    Consultation, EntityKind, MedicalHistory, MedicalHistoryUpdate, Patient, PractitionerId,
    Prescription, Representative,
};
use chrono::{DateTime, Utc};
use medidesk_uuid::RecordId;

/// Any stored row, tagged by its collection.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Patient(Patient),
    Representative(Representative),
    MedicalHistory(MedicalHistory),
    Consultation(Consultation),
    Prescription(Prescription),
}

macro_rules! with_record {
    ($record:expr, $inner:ident => $body:expr) => {
        match $record {
            Record::Patient($inner) => $body,
            Record::Representative($inner) => $body,
            Record::MedicalHistory($inner) => $body,
            Record::Consultation($inner) => $body,
            Record::Prescription($inner) => $body,
        }
    };
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Patient(_) => EntityKind::Patient,
            Record::Representative(_) => EntityKind::Representative,
            Record::MedicalHistory(_) => EntityKind::MedicalHistory,
            Record::Consultation(_) => EntityKind::Consultation,
            Record::Prescription(_) => EntityKind::Prescription,
        }
    }

    pub fn id(&self) -> RecordId {
        with_record!(self, r => r.id)
    }

    pub fn owner_id(&self) -> PractitionerId {
        with_record!(self, r => r.owner_id)
    }

    pub fn is_active(&self) -> bool {
        with_record!(self, r => r.active)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        with_record!(self, r => r.created_at)
    }

    /// The patient this row hangs off directly, if any.
    pub fn patient_id(&self) -> Option<RecordId> {
        match self {
            Record::Representative(r) => Some(r.patient_id),
            Record::MedicalHistory(h) => Some(h.patient_id),
            _ => None,
        }
    }

    /// The medical history this row hangs off directly, if any.
    pub fn medical_history_id(&self) -> Option<RecordId> {
        match self {
            Record::Consultation(c) => Some(c.medical_history_id),
            Record::Prescription(p) => p.medical_history_id,
            _ => None,
        }
    }

    /// Applies `patch` in place and stamps `updated_at`.
    ///
    /// The record is left untouched when any part of the patch does not apply to its kind.
    pub fn apply(&mut self, patch: &RecordPatch, now: DateTime<Utc>) -> Result<(), InvalidPatch> {
        let kind = self.kind();
        if patch.primary.is_some() && kind != EntityKind::Representative {
            return Err(InvalidPatch {
                kind,
                field: "primary",
            });
        }
        if patch.clinical.is_some() && kind != EntityKind::MedicalHistory {
            return Err(InvalidPatch {
                kind,
                field: "clinical",
            });
        }

        if let Some(active) = patch.active {
            with_record!(&mut *self, r => r.active = active);
        }
        match self {
            Record::Representative(r) => {
                if let Some(primary) = patch.primary {
                    r.primary = primary;
                }
            }
            Record::MedicalHistory(h) => {
                if let Some(update) = &patch.clinical {
                    update.apply_to(h);
                }
            }
            _ => {}
        }
        with_record!(&mut *self, r => r.updated_at = now);

        Ok(())
    }
}

/// A patch field was sent to a kind that does not have it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field '{field}' cannot be applied to a {kind}")]
pub struct InvalidPatch {
    pub kind: EntityKind,
    pub field: &'static str,
}

/// Partial update of a stored row. Fields left as `None` are not touched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordPatch {
    pub active: Option<bool>,
    /// Representatives only.
    pub primary: Option<bool>,
    /// Medical histories only.
    pub clinical: Option<MedicalHistoryUpdate>,
}

impl RecordPatch {
    pub fn set_active(active: bool) -> Self {
        Self {
            active: Some(active),
            ..Default::default()
        }
    }

    pub fn set_primary(primary: bool) -> Self {
        Self {
            primary: Some(primary),
            ..Default::default()
        }
    }

    pub fn clinical(update: MedicalHistoryUpdate) -> Self {
        Self {
            clinical: Some(update),
            ..Default::default()
        }
    }
}

/// Query filter understood by every store. Unset fields match everything.
///
/// A foreign-key filter never matches a row kind that has no such key, so
/// `for_patient(..)` against consultations returns nothing rather than everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordFilter {
    pub owner_id: Option<PractitionerId>,
    pub patient_id: Option<RecordId>,
    pub medical_history_id: Option<RecordId>,
    pub active: Option<bool>,
}

impl RecordFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn owned_by(owner_id: PractitionerId) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Default::default()
        }
    }

    pub fn for_patient(patient_id: RecordId) -> Self {
        Self {
            patient_id: Some(patient_id),
            ..Default::default()
        }
    }

    pub fn for_medical_history(medical_history_id: RecordId) -> Self {
        Self {
            medical_history_id: Some(medical_history_id),
            ..Default::default()
        }
    }

    pub fn owner(mut self, owner_id: PractitionerId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn active(mut self, active: Option<bool>) -> Self {
        self.active = active;
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        if self.owner_id.is_some_and(|owner| owner != record.owner_id()) {
            return false;
        }
        if self.active.is_some_and(|active| active != record.is_active()) {
            return false;
        }
        if let Some(patient_id) = self.patient_id {
            if record.patient_id() != Some(patient_id) {
                return false;
            }
        }
        if let Some(history_id) = self.medical_history_id {
            if record.medical_history_id() != Some(history_id) {
                return false;
            }
        }
        true
    }
}
