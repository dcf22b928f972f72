//! Clinical entities and the uniform record envelope the store works with.
//!
//! Every entity is owned by exactly one practitioner and carries its own `active` flag.
//! Relationships are one-directional foreign keys only:
//!
//! ```text
//! Patient <- Representative.patient_id
//! Patient <- MedicalHistory.patient_id
//! MedicalHistory <- Consultation.medical_history_id
//! MedicalHistory <- Prescription.medical_history_id (optional)
//! ```
//!
//! Nothing here navigates from a parent to its children; that is the cascade resolver's job.

mod consultation;
mod medical_history;
mod patient;
mod prescription;
mod record;
mod representative;

pub use consultation::{Consultation, VitalSign, VitalSigns, VitalValue};
pub use medical_history::{MedicalHistory, MedicalHistoryUpdate};
pub use patient::Patient;
pub use prescription::{PatientSnapshot, Prescription};
pub use record::{InvalidPatch, Record, RecordFilter, RecordPatch};
pub use representative::{Relationship, Representative};

use medidesk_uuid::{RecordId, UuidError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The entity collections managed by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Patient,
    Representative,
    MedicalHistory,
    Consultation,
    Prescription,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Patient,
        EntityKind::Representative,
        EntityKind::MedicalHistory,
        EntityKind::Consultation,
        EntityKind::Prescription,
    ];

    /// Directory name of this collection in the file-backed store.
    pub fn collection(&self) -> &'static str {
        use crate::constants::*;
        match self {
            EntityKind::Patient => PATIENTS_DIR_NAME,
            EntityKind::Representative => REPRESENTATIVES_DIR_NAME,
            EntityKind::MedicalHistory => MEDICAL_HISTORIES_DIR_NAME,
            EntityKind::Consultation => CONSULTATIONS_DIR_NAME,
            EntityKind::Prescription => PRESCRIPTIONS_DIR_NAME,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Patient => "patient",
            EntityKind::Representative => "representative",
            EntityKind::MedicalHistory => "medical history",
            EntityKind::Consultation => "consultation",
            EntityKind::Prescription => "prescription",
        };
        f.write_str(name)
    }
}

/// Identifier of the practitioner that owns a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PractitionerId(RecordId);

impl PractitionerId {
    pub fn new() -> Self {
        Self(RecordId::new())
    }

    pub fn parse(input: &str) -> Result<Self, UuidError> {
        RecordId::parse(input).map(Self)
    }

    pub fn as_record_id(&self) -> RecordId {
        self.0
    }
}

impl Default for PractitionerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<RecordId> for PractitionerId {
    fn from(value: RecordId) -> Self {
        Self(value)
    }
}

impl fmt::Display for PractitionerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PractitionerId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A concrete entity type that can be wrapped in, and recovered from, a [`Record`].
pub trait Entity: Clone + Sized {
    const KIND: EntityKind;

    fn id(&self) -> RecordId;
    fn owner_id(&self) -> PractitionerId;
    fn is_active(&self) -> bool;
    fn into_record(self) -> Record;
    /// Returns `None` when the record holds a different kind.
    fn from_record(record: Record) -> Option<Self>;
}

macro_rules! impl_entity {
    ($ty:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = EntityKind::$ty;

            fn id(&self) -> RecordId {
                self.id
            }

            fn owner_id(&self) -> PractitionerId {
                self.owner_id
            }

            fn is_active(&self) -> bool {
                self.active
            }

            fn into_record(self) -> Record {
                Record::$ty(self)
            }

            fn from_record(record: Record) -> Option<Self> {
                match record {
                    Record::$ty(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_entity!(Patient);
impl_entity!(Representative);
impl_entity!(MedicalHistory);
impl_entity!(Consultation);
impl_entity!(Prescription);
