use super::{PatientSnapshot, PractitionerId};
use crate::validation::age_on;
use chrono::{DateTime, NaiveDate, Utc};
use medidesk_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// A patient registered by a practitioner.
///
/// `active` is the root of the soft-delete hierarchy: representatives, the medical history and
/// everything under it follow this flag through the lifecycle engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: RecordId,
    pub owner_id: PractitionerId,
    pub full_name: String,
    /// Unique per practitioner when present. Never copied by duplication.
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Whether the patient is a legal minor on `today`. Patients without a birth date are
    /// treated as adults.
    pub fn is_minor(&self, today: NaiveDate, adult_age: u32) -> bool {
        self.birth_date
            .map(|birth| age_on(birth, today) < adult_age)
            .unwrap_or(false)
    }

    /// The identity fields a prescription keeps inline.
    pub fn snapshot(&self) -> PatientSnapshot {
        PatientSnapshot {
            name: self.full_name.clone(),
            national_id: self.national_id.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
        }
    }
}
