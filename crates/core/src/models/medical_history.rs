use super::PractitionerId;
use chrono::{DateTime, Utc};
use medidesk_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// The single clinical history of a patient, created alongside the patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub id: RecordId,
    pub owner_id: PractitionerId,
    pub patient_id: RecordId,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub chronic_conditions: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub family_history: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalHistory {
    /// An active history with no clinical content yet.
    pub fn empty(
        owner_id: PractitionerId,
        patient_id: RecordId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            owner_id,
            patient_id,
            blood_type: None,
            allergies: None,
            chronic_conditions: None,
            medications: None,
            family_history: None,
            notes,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Replacement values for the clinical fields of a history. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicalHistoryUpdate {
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub chronic_conditions: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub family_history: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MedicalHistoryUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply_to(&self, history: &mut MedicalHistory) {
        fn replace(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                let v = v.trim();
                *target = (!v.is_empty()).then(|| v.to_string());
            }
        }

        replace(&mut history.blood_type, &self.blood_type);
        replace(&mut history.allergies, &self.allergies);
        replace(&mut history.chronic_conditions, &self.chronic_conditions);
        replace(&mut history.medications, &self.medications);
        replace(&mut history.family_history, &self.family_history);
        replace(&mut history.notes, &self.notes);
    }
}
