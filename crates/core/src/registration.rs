//! Registration and clinical flows that create the rows the lifecycle manages.
//!
//! All input is validated before the first insert. Flows that insert more than one row report
//! [`PracticeError::PartialFailure`] when a later insert fails, leaving earlier rows in place.

use crate::config::CoreConfig;
use crate::models::{
    Consultation, EntityKind, MedicalHistory, MedicalHistoryUpdate, Patient, PatientSnapshot,
    PractitionerId, Prescription, RecordFilter, RecordPatch, Relationship, Representative,
    VitalSigns,
};
use crate::ownership::OwnershipVerifier;
use crate::store::{EntityStore, EntityStoreExt};
use crate::validation::{normalise_national_id, normalise_optional, validate_birth_date};
use crate::{PracticeError, PracticeResult};
use chrono::{NaiveDate, Utc};
use medidesk_types::{EmailAddress, NonEmptyText};
use medidesk_uuid::RecordId;
use serde::Deserialize;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NewPatient {
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
    pub birth_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewRepresentative {
    pub full_name: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NewConsultation {
    /// Defaults to today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub reason: String,
    #[serde(default)]
    pub findings: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub vital_signs: VitalSigns,
}

/// A prescription is either linked to a medical history, in which case the patient snapshot is
/// taken from that history's patient, or detached with an explicit snapshot.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NewPrescription {
    #[serde(default)]
    pub medical_history_id: Option<RecordId>,
    /// Required when `medical_history_id` is absent. Ignored otherwise.
    #[serde(default)]
    pub patient: Option<PatientSnapshot>,
    /// Defaults to today.
    #[serde(default)]
    pub date_prescribed: Option<NaiveDate>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    pub medications: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Rows created by [`RegistrationService::register_patient`].
#[derive(Clone, Debug, PartialEq)]
pub struct RegisteredPatient {
    pub patient: Patient,
    pub medical_history: MedicalHistory,
    pub representatives: Vec<Representative>,
}

pub struct RegistrationService<'a, S: ?Sized> {
    store: &'a S,
    cfg: &'a CoreConfig,
}

impl<'a, S: EntityStore + ?Sized> RegistrationService<'a, S> {
    pub fn new(store: &'a S, cfg: &'a CoreConfig) -> Self {
        Self { store, cfg }
    }

    /// Registers a patient together with its medical history and representatives.
    ///
    /// Minors must come with at least one representative. When no representative is flagged
    /// primary the first one becomes primary; when several are, only the first keeps the flag.
    pub fn register_patient(
        &self,
        owner_id: PractitionerId,
        input: NewPatient,
        representatives: Vec<NewRepresentative>,
    ) -> PracticeResult<RegisteredPatient> {
        let now = Utc::now();
        let today = now.date_naive();

        let full_name = NonEmptyText::new(&input.full_name)?;
        if let Some(birth) = input.birth_date {
            validate_birth_date(birth, today)?;
        }
        let patient = Patient {
            id: RecordId::new(),
            owner_id,
            full_name: full_name.into_inner(),
            national_id: normalise_national_id(input.national_id.as_deref())?,
            email: normalise_email(input.email)?,
            phone: normalise_optional(input.phone),
            address: normalise_optional(input.address),
            birth_date: input.birth_date,
            active: true,
            created_at: now,
            updated_at: now,
        };

        if patient.is_minor(today, self.cfg.adult_age()) && representatives.is_empty() {
            return Err(PracticeError::InvalidInput(format!(
                "patients under {} need at least one representative",
                self.cfg.adult_age()
            )));
        }

        let mut reps = representatives
            .into_iter()
            .map(|rep| build_representative(owner_id, patient.id, rep, now))
            .collect::<PracticeResult<Vec<_>>>()?;
        let primary_at = reps.iter().position(|r| r.primary).unwrap_or(0);
        for (i, rep) in reps.iter_mut().enumerate() {
            rep.primary = i == primary_at;
        }

        let patient = self
            .store
            .insert_as(patient)
            .map_err(PracticeError::from_insert)?;

        let medical_history = self
            .store
            .insert_as(MedicalHistory::empty(owner_id, patient.id, None, now))
            .map_err(|source| PracticeError::PartialFailure {
                kind: EntityKind::Patient,
                created_id: patient.id,
                stage: "medical history creation",
                source,
            })?;

        let mut stored_reps = Vec::with_capacity(reps.len());
        for rep in reps {
            let stored = self.store.insert_as(rep).map_err(|source| {
                PracticeError::PartialFailure {
                    kind: EntityKind::Patient,
                    created_id: patient.id,
                    stage: "representative creation",
                    source,
                }
            })?;
            stored_reps.push(stored);
        }

        tracing::info!(
            "registered patient {} with {} representative(s)",
            patient.id,
            stored_reps.len()
        );
        Ok(RegisteredPatient {
            patient,
            medical_history,
            representatives: stored_reps,
        })
    }

    /// Adds a representative to an active patient. A primary representative takes the flag
    /// from the others; the first representative of a patient is always primary.
    pub fn add_representative(
        &self,
        owner_id: PractitionerId,
        patient_id: &RecordId,
        input: NewRepresentative,
    ) -> PracticeResult<Representative> {
        let patient: Patient = OwnershipVerifier::new(self.store).authorize(patient_id, owner_id)?;
        if !patient.active {
            return Err(PracticeError::InvalidInput(
                "cannot add a representative to an archived patient".into(),
            ));
        }

        let existing: Vec<Representative> = self
            .store
            .find_as(&RecordFilter::for_patient(patient.id).owner(owner_id))?;
        let mut rep = build_representative(owner_id, patient.id, input, Utc::now())?;
        if !existing.iter().any(|r| r.active && r.primary) {
            rep.primary = true;
        }

        let rep = self
            .store
            .insert_as(rep)
            .map_err(PracticeError::from_insert)?;

        if rep.primary {
            for other in existing.iter().filter(|r| r.primary) {
                self.store
                    .update(EntityKind::Representative, &other.id, &RecordPatch::set_primary(false))
                    .map_err(|source| PracticeError::PartialFailure {
                        kind: EntityKind::Representative,
                        created_id: rep.id,
                        stage: "primary flag update",
                        source,
                    })?;
            }
        }

        Ok(rep)
    }

    /// Records a consultation against an active medical history.
    pub fn record_consultation(
        &self,
        owner_id: PractitionerId,
        medical_history_id: &RecordId,
        input: NewConsultation,
    ) -> PracticeResult<Consultation> {
        let history: MedicalHistory =
            OwnershipVerifier::new(self.store).authorize(medical_history_id, owner_id)?;
        if !history.active {
            return Err(PracticeError::InvalidInput(
                "cannot record a consultation on an archived medical history".into(),
            ));
        }

        let now = Utc::now();
        let consultation = Consultation {
            id: RecordId::new(),
            owner_id,
            medical_history_id: history.id,
            date: input.date.unwrap_or_else(|| now.date_naive()),
            reason: NonEmptyText::new(&input.reason)?.into_inner(),
            findings: normalise_optional(input.findings),
            diagnosis: normalise_optional(input.diagnosis),
            vital_signs: input.vital_signs,
            active: true,
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_as(consultation)
            .map_err(PracticeError::from_insert)
    }

    /// Issues a prescription, linked or detached.
    pub fn issue_prescription(
        &self,
        owner_id: PractitionerId,
        input: NewPrescription,
    ) -> PracticeResult<Prescription> {
        let medications = NonEmptyText::new(&input.medications)?;

        let (medical_history_id, patient) = match input.medical_history_id {
            Some(history_id) => {
                let verifier = OwnershipVerifier::new(self.store);
                let history: MedicalHistory = verifier.authorize(&history_id, owner_id)?;
                if !history.active {
                    return Err(PracticeError::InvalidInput(
                        "cannot prescribe against an archived medical history".into(),
                    ));
                }
                let patient: Patient = verifier.authorize(&history.patient_id, owner_id)?;
                (Some(history.id), patient.snapshot())
            }
            None => {
                let snapshot = input.patient.ok_or_else(|| {
                    PracticeError::InvalidInput(
                        "a detached prescription needs the patient's details".into(),
                    )
                })?;
                (None, normalise_snapshot(snapshot)?)
            }
        };

        let now = Utc::now();
        let prescription = Prescription {
            id: RecordId::new(),
            owner_id,
            medical_history_id,
            patient,
            date_prescribed: input.date_prescribed.unwrap_or_else(|| now.date_naive()),
            diagnosis: normalise_optional(input.diagnosis),
            medications: medications.into_inner(),
            instructions: normalise_optional(input.instructions),
            notes: normalise_optional(input.notes),
            active: true,
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_as(prescription)
            .map_err(PracticeError::from_insert)
    }

    pub fn update_medical_history(
        &self,
        owner_id: PractitionerId,
        id: &RecordId,
        update: MedicalHistoryUpdate,
    ) -> PracticeResult<MedicalHistory> {
        let history: MedicalHistory = OwnershipVerifier::new(self.store).authorize(id, owner_id)?;
        if update.is_empty() {
            return Err(PracticeError::InvalidInput("nothing to update".into()));
        }
        Ok(self
            .store
            .update_as(&history.id, &RecordPatch::clinical(update))?)
    }

    /// Patients of `owner_id`, most recent first. `active = None` lists both states.
    pub fn list_patients(
        &self,
        owner_id: PractitionerId,
        active: Option<bool>,
    ) -> PracticeResult<Vec<Patient>> {
        Ok(self
            .store
            .find_as(&RecordFilter::owned_by(owner_id).active(active))?)
    }

    pub fn list_prescriptions(
        &self,
        owner_id: PractitionerId,
        active: Option<bool>,
    ) -> PracticeResult<Vec<Prescription>> {
        Ok(self
            .store
            .find_as(&RecordFilter::owned_by(owner_id).active(active))?)
    }

    pub fn list_consultations(
        &self,
        owner_id: PractitionerId,
        medical_history_id: &RecordId,
    ) -> PracticeResult<Vec<Consultation>> {
        let history: MedicalHistory =
            OwnershipVerifier::new(self.store).authorize(medical_history_id, owner_id)?;
        Ok(self
            .store
            .find_as(&RecordFilter::for_medical_history(history.id).owner(owner_id))?)
    }

    pub fn list_representatives(
        &self,
        owner_id: PractitionerId,
        patient_id: &RecordId,
    ) -> PracticeResult<Vec<Representative>> {
        let patient: Patient = OwnershipVerifier::new(self.store).authorize(patient_id, owner_id)?;
        Ok(self
            .store
            .find_as(&RecordFilter::for_patient(patient.id).owner(owner_id))?)
    }
}

fn normalise_email(input: Option<String>) -> PracticeResult<Option<String>> {
    match normalise_optional(input) {
        Some(raw) => Ok(Some(EmailAddress::parse(raw)?.as_str().to_string())),
        None => Ok(None),
    }
}

fn normalise_snapshot(snapshot: PatientSnapshot) -> PracticeResult<PatientSnapshot> {
    Ok(PatientSnapshot {
        name: NonEmptyText::new(&snapshot.name)?.into_inner(),
        national_id: normalise_national_id(snapshot.national_id.as_deref())?,
        phone: normalise_optional(snapshot.phone),
        email: normalise_email(snapshot.email)?,
    })
}

fn build_representative(
    owner_id: PractitionerId,
    patient_id: RecordId,
    input: NewRepresentative,
    now: chrono::DateTime<Utc>,
) -> PracticeResult<Representative> {
    Ok(Representative {
        id: RecordId::new(),
        owner_id,
        patient_id,
        full_name: NonEmptyText::new(&input.full_name)?.into_inner(),
        relationship: input.relationship,
        phone: normalise_optional(input.phone),
        email: normalise_email(input.email)?,
        primary: input.primary,
        active: true,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VitalSign, VitalValue};
    use crate::store::MemoryStore;
    use crate::test_support::{seed_patient, test_config, FlakyStore, PatientSeed};
    use chrono::Duration;

    fn parent(name: &str) -> NewRepresentative {
        NewRepresentative {
            full_name: name.into(),
            relationship: Relationship::Parent,
            phone: None,
            email: None,
            primary: false,
        }
    }

    fn adult(name: &str) -> NewPatient {
        NewPatient {
            full_name: name.into(),
            national_id: Some("x-100".into()),
            email: Some(" Ana@Example.COM ".into()),
            birth_date: NaiveDate::from_ymd_opt(1990, 3, 14),
            ..Default::default()
        }
    }

    #[test]
    fn register_creates_patient_and_history() {
        let store = MemoryStore::new();
        let cfg = test_config();
        let owner = PractitionerId::new();

        let registered = RegistrationService::new(&store, &cfg)
            .register_patient(owner, adult("Ana López"), vec![])
            .expect("registration should succeed");

        assert_eq!(registered.patient.national_id.as_deref(), Some("X-100"));
        assert_eq!(registered.patient.email.as_deref(), Some("ana@example.com"));
        assert_eq!(registered.medical_history.patient_id, registered.patient.id);
        assert!(registered.medical_history.active);
        assert_eq!(store.count(EntityKind::MedicalHistory).unwrap(), 1);
    }

    #[test]
    fn minors_need_a_representative() {
        let store = MemoryStore::new();
        let cfg = test_config();
        let owner = PractitionerId::new();
        let service = RegistrationService::new(&store, &cfg);
        let minor = NewPatient {
            full_name: "Pablo".into(),
            birth_date: Some(Utc::now().date_naive() - Duration::days(365 * 5)),
            ..Default::default()
        };

        let err = service
            .register_patient(owner, minor.clone(), vec![])
            .expect_err("minor without representative");
        assert!(matches!(err, PracticeError::InvalidInput(_)));
        assert_eq!(store.count(EntityKind::Patient).unwrap(), 0);

        let registered = service
            .register_patient(owner, minor, vec![parent("Marta"), parent("Jorge")])
            .unwrap();
        let primaries: Vec<_> = registered
            .representatives
            .iter()
            .filter(|r| r.primary)
            .map(|r| r.full_name.as_str())
            .collect();
        assert_eq!(primaries, vec!["Marta"]);
    }

    #[test]
    fn invalid_input_is_rejected_before_any_insert() {
        let store = MemoryStore::new();
        let cfg = test_config();
        let owner = PractitionerId::new();
        let service = RegistrationService::new(&store, &cfg);

        let blank = NewPatient {
            full_name: "   ".into(),
            ..Default::default()
        };
        assert!(service.register_patient(owner, blank, vec![]).is_err());

        let future = NewPatient {
            full_name: "Ana".into(),
            birth_date: Some(Utc::now().date_naive() + Duration::days(2)),
            ..Default::default()
        };
        assert!(service.register_patient(owner, future, vec![]).is_err());

        let bad_email = NewPatient {
            email: Some("not-an-email".into()),
            ..adult("Ana")
        };
        assert!(service.register_patient(owner, bad_email, vec![]).is_err());

        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn duplicate_national_id_is_a_validation_failure() {
        let store = MemoryStore::new();
        let cfg = test_config();
        let owner = PractitionerId::new();
        let service = RegistrationService::new(&store, &cfg);

        service.register_patient(owner, adult("Ana"), vec![]).unwrap();
        let err = service
            .register_patient(owner, adult("Ana bis"), vec![])
            .expect_err("national id clash");
        assert!(matches!(err, PracticeError::InvalidInput(_)));

        service
            .register_patient(PractitionerId::new(), adult("Ana"), vec![])
            .expect("another practitioner may reuse the id");
    }

    #[test]
    fn history_failure_after_patient_insert_is_partial() {
        let inner = MemoryStore::new();
        let cfg = test_config();
        let store = FlakyStore::new(&inner).fail_inserts_of(EntityKind::MedicalHistory);

        let err = RegistrationService::new(&store, &cfg)
            .register_patient(PractitionerId::new(), adult("Ana"), vec![])
            .expect_err("history insert fails");

        assert!(matches!(
            err,
            PracticeError::PartialFailure {
                stage: "medical history creation",
                ..
            }
        ));
        assert_eq!(inner.count(EntityKind::Patient).unwrap(), 1);
    }

    #[test]
    fn new_primary_representative_clears_the_others() {
        let store = MemoryStore::new();
        let cfg = test_config();
        let owner = PractitionerId::new();
        let seeded = seed_patient(&store, owner, PatientSeed::named("Ana"));
        let service = RegistrationService::new(&store, &cfg);

        let first = service
            .add_representative(owner, &seeded.patient.id, parent("Marta"))
            .unwrap();
        assert!(first.primary, "first representative becomes primary");

        let second = service
            .add_representative(
                owner,
                &seeded.patient.id,
                NewRepresentative {
                    primary: true,
                    ..parent("Jorge")
                },
            )
            .unwrap();
        assert!(second.primary);

        let reps = service
            .list_representatives(owner, &seeded.patient.id)
            .unwrap();
        let primaries: Vec<_> = reps.iter().filter(|r| r.primary).map(|r| r.id).collect();
        assert_eq!(primaries, vec![second.id]);
    }

    #[test]
    fn consultation_requires_an_active_history() {
        let store = MemoryStore::new();
        let cfg = test_config();
        let owner = PractitionerId::new();
        let active = seed_patient(&store, owner, PatientSeed::named("Ana"));
        let archived = seed_patient(&store, owner, PatientSeed::named("Carlos").archived());
        let service = RegistrationService::new(&store, &cfg);

        let mut vitals = VitalSigns::new();
        vitals.insert(VitalSign::Temperature, VitalValue::Number(37.2));
        let input = NewConsultation {
            reason: "Fever".into(),
            vital_signs: vitals,
            ..Default::default()
        };

        let recorded = service
            .record_consultation(owner, &active.history_id(), input.clone())
            .unwrap();
        assert_eq!(recorded.date, Utc::now().date_naive());
        assert_eq!(
            service.list_consultations(owner, &active.history_id()).unwrap(),
            vec![recorded]
        );

        let err = service
            .record_consultation(owner, &archived.history_id(), input.clone())
            .expect_err("archived history");
        assert!(matches!(err, PracticeError::InvalidInput(_)));

        let err = service
            .record_consultation(PractitionerId::new(), &active.history_id(), input)
            .expect_err("foreign history");
        assert!(matches!(err, PracticeError::NotFound { .. }));
    }

    #[test]
    fn linked_prescription_snapshots_the_patient() {
        let store = MemoryStore::new();
        let cfg = test_config();
        let owner = PractitionerId::new();
        let seeded = seed_patient(
            &store,
            owner,
            PatientSeed::named("Ana López").national_id("12345678A"),
        );

        let rx = RegistrationService::new(&store, &cfg)
            .issue_prescription(
                owner,
                NewPrescription {
                    medical_history_id: Some(seeded.history_id()),
                    patient: Some(PatientSnapshot {
                        name: "ignored".into(),
                        ..Default::default()
                    }),
                    medications: "amoxicillin 500mg".into(),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(rx.medical_history_id, Some(seeded.history_id()));
        assert_eq!(rx.patient.name, "Ana López");
        assert_eq!(rx.patient.national_id.as_deref(), Some("12345678A"));
    }

    #[test]
    fn detached_prescription_needs_a_patient_name() {
        let store = MemoryStore::new();
        let cfg = test_config();
        let owner = PractitionerId::new();
        let service = RegistrationService::new(&store, &cfg);

        let missing = NewPrescription {
            medications: "paracetamol".into(),
            ..Default::default()
        };
        assert!(service.issue_prescription(owner, missing).is_err());

        let blank = NewPrescription {
            patient: Some(PatientSnapshot::default()),
            medications: "paracetamol".into(),
            ..Default::default()
        };
        assert!(service.issue_prescription(owner, blank).is_err());

        let rx = service
            .issue_prescription(
                owner,
                NewPrescription {
                    patient: Some(PatientSnapshot {
                        name: "Walk-in".into(),
                        ..Default::default()
                    }),
                    medications: "paracetamol".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(rx.is_detached());
        assert_eq!(
            service.list_prescriptions(owner, Some(true)).unwrap(),
            vec![rx]
        );
    }

    #[test]
    fn medical_history_update_requires_content() {
        let store = MemoryStore::new();
        let cfg = test_config();
        let owner = PractitionerId::new();
        let seeded = seed_patient(&store, owner, PatientSeed::named("Ana"));
        let service = RegistrationService::new(&store, &cfg);

        assert!(service
            .update_medical_history(owner, &seeded.history_id(), MedicalHistoryUpdate::default())
            .is_err());

        let updated = service
            .update_medical_history(
                owner,
                &seeded.history_id(),
                MedicalHistoryUpdate {
                    allergies: Some("penicillin".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.allergies.as_deref(), Some("penicillin"));
    }
}
