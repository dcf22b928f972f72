use super::PractitionerId;
use chrono::{DateTime, NaiveDate, Utc};
use medidesk_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The fixed vocabulary of vital signs a consultation may record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalSign {
    BloodPressure,
    Temperature,
    HeartRate,
    RespiratoryRate,
    Height,
    Weight,
    OxygenSaturation,
    Glucose,
}

impl fmt::Display for VitalSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VitalSign::BloodPressure => "blood_pressure",
            VitalSign::Temperature => "temperature",
            VitalSign::HeartRate => "heart_rate",
            VitalSign::RespiratoryRate => "respiratory_rate",
            VitalSign::Height => "height",
            VitalSign::Weight => "weight",
            VitalSign::OxygenSaturation => "oxygen_saturation",
            VitalSign::Glucose => "glucose",
        };
        f.write_str(name)
    }
}

/// A recorded vital sign value. Blood pressure is usually text (`"120/80"`), the rest numeric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VitalValue {
    Number(f64),
    Text(String),
}

/// Sparse map of vital signs. Unknown keys fail deserialization.
pub type VitalSigns = BTreeMap<VitalSign, VitalValue>;

/// A clinical encounter recorded against a medical history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: RecordId,
    pub owner_id: PractitionerId,
    pub medical_history_id: RecordId,
    pub date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub findings: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub vital_signs: VitalSigns,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
