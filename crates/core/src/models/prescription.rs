use super::PractitionerId;
use chrono::{DateTime, NaiveDate, Utc};
use medidesk_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Patient identity copied inline into a prescription so it stays readable after the patient
/// record changes or disappears.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub name: String,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A prescription, either linked to a medical history or standing alone for a one-off patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: RecordId,
    pub owner_id: PractitionerId,
    /// `None` for detached prescriptions, which never cascade to a patient.
    #[serde(default)]
    pub medical_history_id: Option<RecordId>,
    pub patient: PatientSnapshot,
    pub date_prescribed: NaiveDate,
    #[serde(default)]
    pub diagnosis: Option<String>,
    pub medications: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    pub fn is_detached(&self) -> bool {
        self.medical_history_id.is_none()
    }
}
