use super::PractitionerId;
use chrono::{DateTime, Utc};
use medidesk_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a representative relates to the patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Parent,
    Guardian,
    EmergencyContact,
    Other,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Relationship::Parent => "parent",
            Relationship::Guardian => "guardian",
            Relationship::EmergencyContact => "emergency_contact",
            Relationship::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "parent" => Ok(Relationship::Parent),
            "guardian" => Ok(Relationship::Guardian),
            "emergency_contact" => Ok(Relationship::EmergencyContact),
            "other" => Ok(Relationship::Other),
            other => Err(format!("unknown relationship '{other}'")),
        }
    }
}

/// A parent, guardian or contact person attached to exactly one patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Representative {
    pub id: RecordId,
    pub owner_id: PractitionerId,
    pub patient_id: RecordId,
    pub full_name: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub primary: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
