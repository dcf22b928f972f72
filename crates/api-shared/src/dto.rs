//! JSON request and response bodies.
//!
//! Ids travel as 32-character lowercase hex strings. Dates are `YYYY-MM-DD`.

use chrono::NaiveDate;
use medidesk_core::models::{
    Consultation, MedicalHistory, MedicalHistoryUpdate, Patient, PatientSnapshot, Prescription,
    Relationship, Representative, VitalSigns,
};
use medidesk_core::{
    CascadePreview, DeleteOutcome, KindCounts, NewConsultation, NewPatient, NewPrescription,
    NewRepresentative, Notice, NoticeLevel, PracticeError, RegisteredPatient, StepFailure,
    TransitionReport,
};
use medidesk_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Error body. Fields other than `error` and `notices` are only set for the failures they
/// describe.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    #[serde(default)]
    pub notices: Vec<NoticeRes>,
    /// Steps applied before the root entity failed to update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<TransitionRes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_id: Option<String>,
    /// Row left behind by a multi-step creation that failed part way.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

impl ErrorRes {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            notices: Vec::new(),
            report: None,
            failed_kind: None,
            failed_id: None,
            created_kind: None,
            created_id: None,
            stage: None,
        }
    }

    /// Builds the body for a failed request. Store errors stay opaque; their detail is
    /// only logged.
    pub fn from_practice_error(err: &PracticeError, notices: Vec<Notice>) -> Self {
        if matches!(err, PracticeError::Store(_)) {
            return Self::message("Internal error");
        }
        let mut res = Self::message(err.to_string());
        res.notices = notices_res(notices);
        match err {
            PracticeError::RootUpdateFailure {
                kind, id, report, ..
            } => {
                res.failed_kind = Some(kind.to_string());
                res.failed_id = Some(id.to_string());
                res.report = Some(TransitionRes::new(report, Vec::new()));
            }
            PracticeError::PartialFailure {
                kind,
                created_id,
                stage,
                ..
            } => {
                res.created_kind = Some(kind.to_string());
                res.created_id = Some(created_id.to_string());
                res.stage = Some((*stage).to_string());
            }
            _ => {}
        }
        res
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NoticeRes {
    /// `success`, `warning` or `error`.
    pub level: String,
    pub message: String,
}

impl From<Notice> for NoticeRes {
    fn from(notice: Notice) -> Self {
        let level = match notice.level {
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        Self {
            level: level.into(),
            message: notice.message,
        }
    }
}

fn notices_res(notices: Vec<Notice>) -> Vec<NoticeRes> {
    notices.into_iter().map(NoticeRes::from).collect()
}

// Patients

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RepresentativeReq {
    pub full_name: String,
    /// `parent`, `guardian`, `emergency_contact` or `other`.
    pub relationship: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

impl RepresentativeReq {
    pub fn into_new(self) -> Result<NewRepresentative, String> {
        let relationship: Relationship = self.relationship.parse()?;
        Ok(NewRepresentative {
            full_name: self.full_name,
            relationship,
            phone: self.phone,
            email: self.email,
            primary: self.primary,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    pub full_name: String,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub representatives: Vec<RepresentativeReq>,
}

impl CreatePatientReq {
    /// Splits the request into core inputs. Fails on an unknown relationship.
    pub fn into_parts(self) -> Result<(NewPatient, Vec<NewRepresentative>), String> {
        let representatives = self
            .representatives
            .into_iter()
            .map(RepresentativeReq::into_new)
            .collect::<Result<Vec<_>, _>>()?;
        let patient = NewPatient {
            full_name: self.full_name,
            national_id: self.national_id,
            email: self.email,
            phone: self.phone,
            address: self.address,
            birth_date: self.birth_date,
        };
        Ok((patient, representatives))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub full_name: String,
    pub national_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: String,
}

impl From<&Patient> for PatientRes {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id.to_string(),
            full_name: p.full_name.clone(),
            national_id: p.national_id.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
            address: p.address.clone(),
            birth_date: p.birth_date,
            active: p.active,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RepresentativeRes {
    pub id: String,
    pub patient_id: String,
    pub full_name: String,
    pub relationship: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub primary: bool,
    pub active: bool,
}

impl From<&Representative> for RepresentativeRes {
    fn from(r: &Representative) -> Self {
        Self {
            id: r.id.to_string(),
            patient_id: r.patient_id.to_string(),
            full_name: r.full_name.clone(),
            relationship: r.relationship.to_string(),
            phone: r.phone.clone(),
            email: r.email.clone(),
            primary: r.primary,
            active: r.active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListRepresentativesRes {
    pub representatives: Vec<RepresentativeRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientRes {
    pub patient: PatientRes,
    pub medical_history_id: String,
    pub representatives: Vec<RepresentativeRes>,
    pub notices: Vec<NoticeRes>,
}

impl CreatePatientRes {
    pub fn new(registered: &RegisteredPatient, notices: Vec<Notice>) -> Self {
        Self {
            patient: PatientRes::from(&registered.patient),
            medical_history_id: registered.medical_history.id.to_string(),
            representatives: registered
                .representatives
                .iter()
                .map(RepresentativeRes::from)
                .collect(),
            notices: notices_res(notices),
        }
    }
}

// Clinical records

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateMedicalHistoryReq {
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
    pub medications: Option<String>,
    pub family_history: Option<String>,
    pub notes: Option<String>,
}

impl From<UpdateMedicalHistoryReq> for MedicalHistoryUpdate {
    fn from(req: UpdateMedicalHistoryReq) -> Self {
        MedicalHistoryUpdate {
            blood_type: req.blood_type,
            allergies: req.allergies,
            chronic_conditions: req.chronic_conditions,
            medications: req.medications,
            family_history: req.family_history,
            notes: req.notes,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MedicalHistoryRes {
    pub id: String,
    pub patient_id: String,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
    pub medications: Option<String>,
    pub family_history: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
}

impl From<&MedicalHistory> for MedicalHistoryRes {
    fn from(h: &MedicalHistory) -> Self {
        Self {
            id: h.id.to_string(),
            patient_id: h.patient_id.to_string(),
            blood_type: h.blood_type.clone(),
            allergies: h.allergies.clone(),
            chronic_conditions: h.chronic_conditions.clone(),
            medications: h.medications.clone(),
            family_history: h.family_history.clone(),
            notes: h.notes.clone(),
            active: h.active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateConsultationReq {
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    pub reason: String,
    #[serde(default)]
    pub findings: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    /// Keys: blood_pressure, temperature, heart_rate, respiratory_rate, height, weight,
    /// oxygen_saturation, glucose. Values are numbers or strings.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub vital_signs: VitalSigns,
}

impl From<CreateConsultationReq> for NewConsultation {
    fn from(req: CreateConsultationReq) -> Self {
        NewConsultation {
            date: req.date,
            reason: req.reason,
            findings: req.findings,
            diagnosis: req.diagnosis,
            vital_signs: req.vital_signs,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConsultationRes {
    pub id: String,
    pub medical_history_id: String,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub reason: String,
    pub findings: Option<String>,
    pub diagnosis: Option<String>,
    #[schema(value_type = Object)]
    pub vital_signs: VitalSigns,
    pub active: bool,
}

impl From<&Consultation> for ConsultationRes {
    fn from(c: &Consultation) -> Self {
        Self {
            id: c.id.to_string(),
            medical_history_id: c.medical_history_id.to_string(),
            date: c.date,
            reason: c.reason.clone(),
            findings: c.findings.clone(),
            diagnosis: c.diagnosis.clone(),
            vital_signs: c.vital_signs.clone(),
            active: c.active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListConsultationsRes {
    pub consultations: Vec<ConsultationRes>,
}

// Prescriptions

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreatePrescriptionReq {
    /// Omit for a detached prescription; `patient_name` is then required.
    #[serde(default)]
    pub medical_history_id: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_national_id: Option<String>,
    #[serde(default)]
    pub patient_phone: Option<String>,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_prescribed: Option<NaiveDate>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    pub medications: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreatePrescriptionReq {
    /// Converts to the core input. Fails on a malformed history id.
    pub fn into_new(self) -> Result<NewPrescription, String> {
        let medical_history_id = self
            .medical_history_id
            .as_deref()
            .map(RecordId::parse)
            .transpose()
            .map_err(|e| e.to_string())?;
        let patient = self.patient_name.map(|name| PatientSnapshot {
            name,
            national_id: self.patient_national_id,
            phone: self.patient_phone,
            email: self.patient_email,
        });
        Ok(NewPrescription {
            medical_history_id,
            patient,
            date_prescribed: self.date_prescribed,
            diagnosis: self.diagnosis,
            medications: self.medications,
            instructions: self.instructions,
            notes: self.notes,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionRes {
    pub id: String,
    pub medical_history_id: Option<String>,
    pub patient_name: String,
    pub patient_national_id: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
    #[schema(value_type = String, format = Date)]
    pub date_prescribed: NaiveDate,
    pub diagnosis: Option<String>,
    pub medications: String,
    pub instructions: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
}

impl From<&Prescription> for PrescriptionRes {
    fn from(rx: &Prescription) -> Self {
        Self {
            id: rx.id.to_string(),
            medical_history_id: rx.medical_history_id.map(|id| id.to_string()),
            patient_name: rx.patient.name.clone(),
            patient_national_id: rx.patient.national_id.clone(),
            patient_phone: rx.patient.phone.clone(),
            patient_email: rx.patient.email.clone(),
            date_prescribed: rx.date_prescribed,
            diagnosis: rx.diagnosis.clone(),
            medications: rx.medications.clone(),
            instructions: rx.instructions.clone(),
            notes: rx.notes.clone(),
            active: rx.active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPrescriptionsRes {
    pub prescriptions: Vec<PrescriptionRes>,
}

// Lifecycle

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CountsRes {
    pub patients: usize,
    pub representatives: usize,
    pub medical_histories: usize,
    pub consultations: usize,
    pub prescriptions: usize,
}

impl From<KindCounts> for CountsRes {
    fn from(c: KindCounts) -> Self {
        Self {
            patients: c.patients,
            representatives: c.representatives,
            medical_histories: c.medical_histories,
            consultations: c.consultations,
            prescriptions: c.prescriptions,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StepFailureRes {
    /// Entity kind, e.g. `consultation`.
    pub kind: String,
    pub id: String,
    pub reason: String,
}

impl From<&StepFailure> for StepFailureRes {
    fn from(f: &StepFailure) -> Self {
        Self {
            kind: f.kind.to_string(),
            id: f.id.to_string(),
            reason: f.reason.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionRes {
    pub success: bool,
    /// `archive` or `restore`.
    pub direction: String,
    pub root_kind: String,
    pub root_id: String,
    pub changed: CountsRes,
    pub unchanged: CountsRes,
    pub failures: Vec<StepFailureRes>,
    pub notices: Vec<NoticeRes>,
}

impl TransitionRes {
    pub fn new(report: &TransitionReport, notices: Vec<Notice>) -> Self {
        Self {
            success: report.success,
            direction: report.direction.to_string(),
            root_kind: report.root_kind.to_string(),
            root_id: report.root_id.to_string(),
            changed: report.changed.into(),
            unchanged: report.unchanged.into(),
            failures: report.failures.iter().map(StepFailureRes::from).collect(),
            notices: notices_res(notices),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PreviewRes {
    pub includes_patient: bool,
    pub patient_name: Option<String>,
    pub medical_history: bool,
    pub consultations: usize,
    pub prescriptions: usize,
    pub representatives: usize,
}

impl From<&CascadePreview> for PreviewRes {
    fn from(p: &CascadePreview) -> Self {
        Self {
            includes_patient: p.includes_patient,
            patient_name: p.patient_name.clone(),
            medical_history: p.medical_history,
            consultations: p.consultations,
            prescriptions: p.prescriptions,
            representatives: p.representatives,
        }
    }
}

/// Body of a `409 Conflict` answer to a restore that would also restore an archived patient.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfirmationRequiredRes {
    pub message: String,
    pub preview: PreviewRes,
}

impl From<&CascadePreview> for ConfirmationRequiredRes {
    fn from(preview: &CascadePreview) -> Self {
        let patient = preview.patient_name.as_deref().unwrap_or("the patient");
        Self {
            message: format!(
                "Restoring this prescription also restores {patient} with {} consultation(s), {} prescription(s) and {} representative(s). Repeat with confirm=true to proceed.",
                preview.consultations, preview.prescriptions, preview.representatives
            ),
            preview: preview.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DuplicateRes {
    pub id: String,
    pub notices: Vec<NoticeRes>,
}

impl DuplicateRes {
    pub fn new(id: RecordId, notices: Vec<Notice>) -> Self {
        Self {
            id: id.to_string(),
            notices: notices_res(notices),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteRes {
    /// `deleted` or `archived`.
    pub outcome: String,
    pub representatives_deleted: usize,
    pub report: Option<TransitionRes>,
    pub notices: Vec<NoticeRes>,
}

impl DeleteRes {
    pub fn new(outcome: &DeleteOutcome, notices: Vec<Notice>) -> Self {
        match outcome {
            DeleteOutcome::Deleted { representatives } => Self {
                outcome: "deleted".into(),
                representatives_deleted: *representatives,
                report: None,
                notices: notices_res(notices),
            },
            DeleteOutcome::Archived { report } => Self {
                outcome: "archived".into(),
                representatives_deleted: 0,
                report: Some(TransitionRes::new(report, Vec::new())),
                notices: notices_res(notices),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_patient_req_rejects_unknown_relationship() {
        let req: CreatePatientReq = serde_json::from_value(serde_json::json!({
            "full_name": "Pablo",
            "birth_date": "2020-05-01",
            "representatives": [{ "full_name": "Marta", "relationship": "aunt" }]
        }))
        .unwrap();
        assert!(req.into_parts().is_err());
    }

    #[test]
    fn create_patient_req_maps_representatives() {
        let req: CreatePatientReq = serde_json::from_value(serde_json::json!({
            "full_name": "Pablo",
            "birth_date": "2020-05-01",
            "representatives": [{ "full_name": "Marta", "relationship": "guardian", "primary": true }]
        }))
        .unwrap();
        let (patient, reps) = req.into_parts().unwrap();
        assert_eq!(patient.birth_date, NaiveDate::from_ymd_opt(2020, 5, 1));
        assert_eq!(reps[0].relationship, Relationship::Guardian);
        assert!(reps[0].primary);
    }

    #[test]
    fn detached_prescription_req_builds_snapshot() {
        let req = CreatePrescriptionReq {
            patient_name: Some("Walk-in".into()),
            medications: "ibuprofen".into(),
            ..Default::default()
        };
        let new = req.into_new().unwrap();
        assert!(new.medical_history_id.is_none());
        assert_eq!(new.patient.map(|p| p.name), Some("Walk-in".to_string()));
    }

    #[test]
    fn malformed_history_id_is_rejected() {
        let req = CreatePrescriptionReq {
            medical_history_id: Some("nope".into()),
            medications: "ibuprofen".into(),
            ..Default::default()
        };
        assert!(req.into_new().is_err());
    }

    #[test]
    fn confirmation_message_names_the_patient() {
        let preview = CascadePreview {
            includes_patient: true,
            patient_name: Some("Carlos".into()),
            medical_history: true,
            consultations: 2,
            prescriptions: 1,
            representatives: 1,
        };
        let res = ConfirmationRequiredRes::from(&preview);
        assert!(res.message.starts_with("Restoring this prescription also restores Carlos"));
        assert_eq!(res.preview.consultations, 2);
    }

    #[test]
    fn partial_failure_error_names_the_orphan() {
        let created_id = RecordId::new();
        let err = PracticeError::PartialFailure {
            kind: medidesk_core::models::EntityKind::Patient,
            created_id,
            stage: "medical history creation",
            source: medidesk_core::StoreError::Unavailable("disk full".into()),
        };

        let res = ErrorRes::from_practice_error(&err, vec![Notice::error("Could not duplicate")]);

        assert_eq!(res.created_kind.as_deref(), Some("patient"));
        assert_eq!(res.created_id, Some(created_id.to_string()));
        assert_eq!(res.stage.as_deref(), Some("medical history creation"));
        assert_eq!(res.notices.len(), 1);
        assert!(res.report.is_none());
    }

    #[test]
    fn store_error_stays_opaque() {
        let err = PracticeError::Store(medidesk_core::StoreError::Unavailable("disk full".into()));

        let res = ErrorRes::from_practice_error(&err, vec![Notice::error("store error: disk")]);

        assert_eq!(res.error, "Internal error");
        assert!(res.notices.is_empty());
        let json = serde_json::to_value(&res).unwrap();
        assert!(json.get("created_id").is_none());
    }
}
