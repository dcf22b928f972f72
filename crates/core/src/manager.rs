//! The archive lifecycle manager: the entry point page handlers and the CLI call.
//!
//! Each operation takes the session explicitly, resolves the practitioner, and delegates to the
//! verifier, resolver, engine and services. Outcomes are pushed to the notification sink: a
//! success notice when the root commits, a warning listing dependents that failed, and an error
//! notice for any fatal failure.

use crate::cascade::{CascadeResolver, CascadeRoot, CascadeSet};
use crate::config::CoreConfig;
use crate::duplication::DuplicationService;
use crate::lifecycle::{CascadePreview, Direction, LifecycleEngine, TransitionReport};
use crate::models::{
    Consultation, EntityKind, MedicalHistory, MedicalHistoryUpdate, Patient, Prescription,
    PractitionerId, RecordFilter, Representative,
};
use crate::notification::{Notice, NotificationSink, TracingSink};
use crate::ownership::OwnershipVerifier;
use crate::registration::{
    NewConsultation, NewPatient, NewPrescription, NewRepresentative, RegisteredPatient,
    RegistrationService,
};
use crate::session::{require_user, SessionProvider};
use crate::store::{EntityStore, EntityStoreExt};
use crate::{PracticeError, PracticeResult};
use medidesk_uuid::RecordId;
use serde::Serialize;
use std::sync::Arc;

/// Whether the caller has confirmed a restore that widens to a whole patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Confirmation {
    #[default]
    Unconfirmed,
    Confirmed,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Unconfirmed
        }
    }
}

/// Result of an operation that may stop to ask for confirmation.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Completed(TransitionReport),
    /// Nothing was written. Repeat the call with [`Confirmation::Confirmed`] to proceed.
    ConfirmationRequired(CascadePreview),
}

/// What `delete_patient` actually did.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The patient had no clinical footprint and was removed with its representatives.
    Deleted { representatives: usize },
    /// The patient had a medical history, so it was archived instead.
    Archived { report: TransitionReport },
}

pub struct ArchiveLifecycleManager<S: ?Sized = dyn EntityStore> {
    cfg: Arc<CoreConfig>,
    store: Arc<S>,
    sink: Arc<dyn NotificationSink>,
}

impl<S: ?Sized> Clone for ArchiveLifecycleManager<S> {
    fn clone(&self) -> Self {
        Self {
            cfg: Arc::clone(&self.cfg),
            store: Arc::clone(&self.store),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S: EntityStore + ?Sized> ArchiveLifecycleManager<S> {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<S>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { cfg, store, sink }
    }

    /// A manager whose notices go to the tracing subscriber.
    pub fn with_tracing(cfg: Arc<CoreConfig>, store: Arc<S>) -> Self {
        Self::new(cfg, store, Arc::new(TracingSink))
    }

    /// The same manager, reporting to another sink.
    pub fn with_sink(&self, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            cfg: Arc::clone(&self.cfg),
            store: Arc::clone(&self.store),
            sink,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn archive_patient(
        &self,
        session: &dyn SessionProvider,
        id: &RecordId,
    ) -> PracticeResult<TransitionReport> {
        let result = self
            .owner(session)
            .and_then(|owner| self.resolve(CascadeRoot::patient(*id), owner))
            .and_then(|set| self.commit(&set, Direction::Archive));
        self.notify_failure("archive patient", result)
    }

    pub fn restore_patient(
        &self,
        session: &dyn SessionProvider,
        id: &RecordId,
    ) -> PracticeResult<TransitionReport> {
        let result = self
            .owner(session)
            .and_then(|owner| self.resolve(CascadeRoot::patient(*id), owner))
            .and_then(|set| self.commit(&set, Direction::Restore));
        self.notify_failure("restore patient", result)
    }

    pub fn archive_prescription(
        &self,
        session: &dyn SessionProvider,
        id: &RecordId,
    ) -> PracticeResult<TransitionReport> {
        let result = self
            .owner(session)
            .and_then(|owner| self.resolve(CascadeRoot::prescription(*id), owner))
            .and_then(|set| self.commit(&set, Direction::Archive));
        self.notify_failure("archive prescription", result)
    }

    /// Restores a prescription. When its patient is archived the restore covers the whole
    /// patient, and without confirmation only the preview is returned.
    pub fn restore_prescription(
        &self,
        session: &dyn SessionProvider,
        id: &RecordId,
        confirmation: Confirmation,
    ) -> PracticeResult<Outcome> {
        let result = self
            .owner(session)
            .and_then(|owner| self.resolve(CascadeRoot::prescription(*id), owner))
            .and_then(|set| {
                if set.includes_patient() && confirmation == Confirmation::Unconfirmed {
                    let preview = LifecycleEngine::new(&*self.store).preview(&set);
                    tracing::debug!(
                        "restore of prescription {} needs confirmation ({} consultations, {} prescriptions, {} representatives)",
                        id,
                        preview.consultations,
                        preview.prescriptions,
                        preview.representatives
                    );
                    return Ok(Outcome::ConfirmationRequired(preview));
                }
                self.commit(&set, Direction::Restore).map(Outcome::Completed)
            });
        self.notify_failure("restore prescription", result)
    }

    pub fn preview_patient(
        &self,
        session: &dyn SessionProvider,
        id: &RecordId,
    ) -> PracticeResult<CascadePreview> {
        let owner = self.owner(session)?;
        let set = self.resolve(CascadeRoot::patient(*id), owner)?;
        Ok(LifecycleEngine::new(&*self.store).preview(&set))
    }

    pub fn preview_prescription(
        &self,
        session: &dyn SessionProvider,
        id: &RecordId,
    ) -> PracticeResult<CascadePreview> {
        let owner = self.owner(session)?;
        let set = self.resolve(CascadeRoot::prescription(*id), owner)?;
        Ok(LifecycleEngine::new(&*self.store).preview(&set))
    }

    pub fn duplicate_patient(
        &self,
        session: &dyn SessionProvider,
        id: &RecordId,
    ) -> PracticeResult<Patient> {
        let result = self.owner(session).and_then(|owner| {
            DuplicationService::new(&*self.store, &self.cfg).duplicate_patient(id, owner)
        });
        if let Ok(copy) = &result {
            self.sink
                .notify(Notice::success(format!("Patient duplicated as {}", copy.full_name)));
        }
        self.notify_failure("duplicate patient", result)
    }

    pub fn duplicate_prescription(
        &self,
        session: &dyn SessionProvider,
        id: &RecordId,
    ) -> PracticeResult<Prescription> {
        let result = self.owner(session).and_then(|owner| {
            DuplicationService::new(&*self.store, &self.cfg).duplicate_prescription(id, owner)
        });
        if let Ok(copy) = &result {
            self.sink.notify(Notice::success(format!(
                "Prescription for {} duplicated",
                copy.patient.name
            )));
        }
        self.notify_failure("duplicate prescription", result)
    }

    /// Deletes a patient that never had a medical history; archives it otherwise.
    pub fn delete_patient(
        &self,
        session: &dyn SessionProvider,
        id: &RecordId,
    ) -> PracticeResult<DeleteOutcome> {
        let result = self
            .owner(session)
            .and_then(|owner| self.delete_or_archive(id, owner));
        self.notify_failure("delete patient", result)
    }

    pub fn register_patient(
        &self,
        session: &dyn SessionProvider,
        input: NewPatient,
        representatives: Vec<NewRepresentative>,
    ) -> PracticeResult<RegisteredPatient> {
        let result = self.owner(session).and_then(|owner| {
            self.registration()
                .register_patient(owner, input, representatives)
        });
        if let Ok(registered) = &result {
            self.sink.notify(Notice::success(format!(
                "Patient {} registered",
                registered.patient.full_name
            )));
        }
        self.notify_failure("register patient", result)
    }

    pub fn add_representative(
        &self,
        session: &dyn SessionProvider,
        patient_id: &RecordId,
        input: NewRepresentative,
    ) -> PracticeResult<Representative> {
        let result = self.owner(session).and_then(|owner| {
            self.registration()
                .add_representative(owner, patient_id, input)
        });
        if let Ok(rep) = &result {
            self.sink
                .notify(Notice::success(format!("Representative {} added", rep.full_name)));
        }
        self.notify_failure("add representative", result)
    }

    pub fn record_consultation(
        &self,
        session: &dyn SessionProvider,
        medical_history_id: &RecordId,
        input: NewConsultation,
    ) -> PracticeResult<Consultation> {
        let result = self.owner(session).and_then(|owner| {
            self.registration()
                .record_consultation(owner, medical_history_id, input)
        });
        if result.is_ok() {
            self.sink.notify(Notice::success("Consultation recorded"));
        }
        self.notify_failure("record consultation", result)
    }

    pub fn issue_prescription(
        &self,
        session: &dyn SessionProvider,
        input: NewPrescription,
    ) -> PracticeResult<Prescription> {
        let result = self
            .owner(session)
            .and_then(|owner| self.registration().issue_prescription(owner, input));
        if let Ok(rx) = &result {
            self.sink.notify(Notice::success(format!(
                "Prescription for {} issued",
                rx.patient.name
            )));
        }
        self.notify_failure("issue prescription", result)
    }

    pub fn update_medical_history(
        &self,
        session: &dyn SessionProvider,
        id: &RecordId,
        update: MedicalHistoryUpdate,
    ) -> PracticeResult<MedicalHistory> {
        let result = self
            .owner(session)
            .and_then(|owner| self.registration().update_medical_history(owner, id, update));
        if result.is_ok() {
            self.sink.notify(Notice::success("Medical history updated"));
        }
        self.notify_failure("update medical history", result)
    }

    pub fn list_patients(
        &self,
        session: &dyn SessionProvider,
        active: Option<bool>,
    ) -> PracticeResult<Vec<Patient>> {
        let owner = self.owner(session)?;
        self.registration().list_patients(owner, active)
    }

    pub fn list_prescriptions(
        &self,
        session: &dyn SessionProvider,
        active: Option<bool>,
    ) -> PracticeResult<Vec<Prescription>> {
        let owner = self.owner(session)?;
        self.registration().list_prescriptions(owner, active)
    }

    pub fn list_consultations(
        &self,
        session: &dyn SessionProvider,
        medical_history_id: &RecordId,
    ) -> PracticeResult<Vec<Consultation>> {
        let owner = self.owner(session)?;
        self.registration()
            .list_consultations(owner, medical_history_id)
    }

    pub fn list_representatives(
        &self,
        session: &dyn SessionProvider,
        patient_id: &RecordId,
    ) -> PracticeResult<Vec<Representative>> {
        let owner = self.owner(session)?;
        self.registration()
            .list_representatives(owner, patient_id)
    }

    fn owner(&self, session: &dyn SessionProvider) -> PracticeResult<PractitionerId> {
        require_user(session).map(|user| user.id)
    }

    fn registration(&self) -> RegistrationService<'_, S> {
        RegistrationService::new(&*self.store, &self.cfg)
    }

    fn resolve(&self, root: CascadeRoot, owner: PractitionerId) -> PracticeResult<CascadeSet> {
        CascadeResolver::new(&*self.store).resolve(root, owner)
    }

    /// Runs the engine and turns a failed root into [`PracticeError::RootUpdateFailure`].
    fn commit(&self, set: &CascadeSet, direction: Direction) -> PracticeResult<TransitionReport> {
        let report = LifecycleEngine::new(&*self.store).transition(set, direction);

        if let Some(failure) = report.root_failure.clone() {
            return Err(PracticeError::RootUpdateFailure {
                kind: failure.kind,
                id: failure.id,
                direction,
                reason: failure.reason,
                report: Box::new(report),
            });
        }

        self.sink.notify(Notice::success(format!(
            "{} {}",
            capitalise(&set.label()),
            direction.past_tense()
        )));
        if report.has_failures() {
            self.sink.notify(Notice::warning(format!(
                "{} related record(s) could not be {}: {}",
                report.failures.len(),
                direction.past_tense(),
                describe_counts(&report)
            )));
        }
        Ok(report)
    }

    fn delete_or_archive(
        &self,
        id: &RecordId,
        owner: PractitionerId,
    ) -> PracticeResult<DeleteOutcome> {
        let patient: Patient = OwnershipVerifier::new(&*self.store).authorize(id, owner)?;

        let histories: Vec<MedicalHistory> = self
            .store
            .find_as(&RecordFilter::for_patient(patient.id).owner(owner))?;
        if !histories.is_empty() {
            tracing::info!(
                "patient {} has clinical records; archiving instead of deleting",
                patient.id
            );
            let set = CascadeResolver::new(&*self.store).resolve_patient(patient)?;
            let report = self.commit(&set, Direction::Archive)?;
            return Ok(DeleteOutcome::Archived { report });
        }

        let representatives: Vec<Representative> = self
            .store
            .find_as(&RecordFilter::for_patient(patient.id).owner(owner))?;
        for rep in &representatives {
            self.store.delete(EntityKind::Representative, &rep.id)?;
        }
        self.store.delete(EntityKind::Patient, &patient.id)?;

        tracing::info!(
            "deleted patient {} and {} representative(s)",
            patient.id,
            representatives.len()
        );
        self.sink
            .notify(Notice::success(format!("Patient {} deleted", patient.full_name)));
        Ok(DeleteOutcome::Deleted {
            representatives: representatives.len(),
        })
    }

    fn notify_failure<T>(&self, action: &str, result: PracticeResult<T>) -> PracticeResult<T> {
        if let Err(err) = &result {
            self.sink
                .notify(Notice::error(format!("Could not {action}: {err}")));
        }
        result
    }
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn describe_counts(report: &TransitionReport) -> String {
    let counts = report.failure_counts();
    EntityKind::ALL
        .iter()
        .filter(|kind| counts.get(**kind) > 0)
        .map(|kind| format!("{} {}", counts.get(*kind), kind))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::notification::{CollectingSink, NoticeLevel};
    use crate::session::StaticSession;
    use crate::store::MemoryStore;
    use crate::test_support::{
        reload, seed_detached_prescription, seed_patient, test_config, FlakyStore, PatientSeed,
    };

    struct Harness {
        store: Arc<MemoryStore>,
        sink: Arc<CollectingSink>,
        manager: ArchiveLifecycleManager<MemoryStore>,
        owner: PractitionerId,
        session: StaticSession,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(CollectingSink::new());
        let manager =
            ArchiveLifecycleManager::new(Arc::new(test_config()), Arc::clone(&store), sink.clone());
        let owner = PractitionerId::new();
        Harness {
            store,
            sink,
            manager,
            owner,
            session: StaticSession::authenticated(owner),
        }
    }

    fn active_flags(store: &MemoryStore) -> Vec<bool> {
        store
            .snapshot()
            .unwrap()
            .iter()
            .map(Record::is_active)
            .collect()
    }

    #[test]
    fn archive_and_restore_a_patient_with_dependents() {
        let h = harness();
        let ana = seed_patient(
            &*h.store,
            h.owner,
            PatientSeed::named("Ana López")
                .consultations(2)
                .prescriptions(1)
                .representatives(1),
        );

        let report = h.manager.archive_patient(&h.session, &ana.patient.id).unwrap();
        assert!(report.success);
        assert!(active_flags(&h.store).iter().all(|a| !a));

        let notices = h.sink.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Success);
        assert_eq!(notices[0].message, "Patient Ana López archived");

        let report = h.manager.restore_patient(&h.session, &ana.patient.id).unwrap();
        assert!(report.success);
        assert!(active_flags(&h.store).iter().all(|a| *a));
    }

    #[test]
    fn archiving_a_detached_prescription_leaves_patients_alone() {
        let h = harness();
        seed_patient(&*h.store, h.owner, PatientSeed::named("Ana").consultations(1));
        let rx = seed_detached_prescription(&*h.store, h.owner, "Walk-in");

        let report = h.manager.archive_prescription(&h.session, &rx.id).unwrap();
        assert_eq!(report.changed.total(), 1);

        let archived = h.manager.list_patients(&h.session, Some(false)).unwrap();
        assert!(archived.is_empty());
        let archived_rx = h.manager.list_prescriptions(&h.session, Some(false)).unwrap();
        assert_eq!(archived_rx.len(), 1);
        assert_eq!(archived_rx[0].id, rx.id);
    }

    #[test]
    fn restoring_a_prescription_of_an_archived_patient_needs_confirmation() {
        let h = harness();
        let carlos = seed_patient(
            &*h.store,
            h.owner,
            PatientSeed::named("Carlos")
                .consultations(2)
                .prescriptions(2)
                .representatives(1)
                .archived(),
        );
        let p2 = carlos.prescriptions[0].id;
        let before = h.store.snapshot().unwrap();

        let outcome = h
            .manager
            .restore_prescription(&h.session, &p2, Confirmation::Unconfirmed)
            .unwrap();
        let Outcome::ConfirmationRequired(preview) = outcome else {
            panic!("expected a confirmation request");
        };
        assert!(preview.includes_patient);
        assert_eq!(preview.consultations, 2);
        assert_eq!(preview.prescriptions, 2);
        assert_eq!(preview.representatives, 1);
        assert_eq!(h.store.snapshot().unwrap(), before, "declining must not write");
        assert!(h.sink.take().is_empty());

        let outcome = h
            .manager
            .restore_prescription(&h.session, &p2, Confirmation::Confirmed)
            .unwrap();
        let Outcome::Completed(report) = outcome else {
            panic!("expected a completed restore");
        };
        assert!(report.success);
        assert_eq!(report.changed.total(), 7);
        let patient: Patient = reload(&*h.store, &carlos.patient.id);
        assert!(patient.active);
    }

    #[test]
    fn restoring_a_prescription_of_an_active_patient_needs_no_confirmation() {
        let h = harness();
        let ana = seed_patient(&*h.store, h.owner, PatientSeed::named("Ana").prescriptions(1));
        let rx = ana.prescriptions[0].id;
        h.manager.archive_prescription(&h.session, &rx).unwrap();

        let outcome = h
            .manager
            .restore_prescription(&h.session, &rx, Confirmation::Unconfirmed)
            .unwrap();
        assert!(matches!(outcome, Outcome::Completed(ref r) if r.changed.total() == 1));
    }

    #[test]
    fn duplicate_of_archived_patient_is_active_without_identity() {
        let h = harness();
        let ana = seed_patient(
            &*h.store,
            h.owner,
            PatientSeed::named("Ana López")
                .national_id("12345678A")
                .archived(),
        );

        let copy = h.manager.duplicate_patient(&h.session, &ana.patient.id).unwrap();

        assert_eq!(copy.full_name, "Ana López (Copy)");
        assert_eq!(copy.national_id, None);
        assert!(copy.active);
        let histories: Vec<MedicalHistory> = h
            .store
            .find_as(&RecordFilter::for_patient(copy.id))
            .unwrap();
        assert_eq!(histories[0].notes.as_deref(), Some("Duplicated from: Ana López"));
    }

    #[test]
    fn missing_session_is_unauthenticated_not_not_found() {
        let h = harness();
        let ana = seed_patient(&*h.store, h.owner, PatientSeed::named("Ana"));
        let anonymous = StaticSession::anonymous();

        let err = h
            .manager
            .archive_patient(&anonymous, &ana.patient.id)
            .expect_err("no session");
        assert!(matches!(err, PracticeError::Unauthenticated));

        let intruder = StaticSession::authenticated(PractitionerId::new());
        let err = h
            .manager
            .archive_patient(&intruder, &ana.patient.id)
            .expect_err("foreign practitioner");
        assert!(matches!(err, PracticeError::NotFound { .. }));

        let notices = h.sink.take();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Error));
        let patient: Patient = reload(&*h.store, &ana.patient.id);
        assert!(patient.active);
    }

    #[test]
    fn foreign_practitioner_cannot_touch_any_operation() {
        let h = harness();
        let ana = seed_patient(
            &*h.store,
            h.owner,
            PatientSeed::named("Ana").prescriptions(1).representatives(1),
        );
        let before = h.store.snapshot().unwrap();
        let intruder = StaticSession::authenticated(PractitionerId::new());
        let rx = ana.prescriptions[0].id;

        let not_found = |err: PracticeError| matches!(err, PracticeError::NotFound { .. });
        assert!(not_found(h.manager.archive_patient(&intruder, &ana.patient.id).unwrap_err()));
        assert!(not_found(h.manager.restore_patient(&intruder, &ana.patient.id).unwrap_err()));
        assert!(not_found(h.manager.archive_prescription(&intruder, &rx).unwrap_err()));
        assert!(not_found(
            h.manager
                .restore_prescription(&intruder, &rx, Confirmation::Confirmed)
                .unwrap_err()
        ));
        assert!(not_found(h.manager.duplicate_patient(&intruder, &ana.patient.id).unwrap_err()));
        assert!(not_found(h.manager.duplicate_prescription(&intruder, &rx).unwrap_err()));
        assert!(not_found(h.manager.delete_patient(&intruder, &ana.patient.id).unwrap_err()));
        assert!(not_found(h.manager.preview_patient(&intruder, &ana.patient.id).unwrap_err()));

        assert_eq!(h.store.snapshot().unwrap(), before);
    }

    #[test]
    fn delete_removes_patient_without_clinical_footprint() {
        let h = harness();
        let luis = seed_patient(
            &*h.store,
            h.owner,
            PatientSeed::named("Luis").without_history().representatives(2),
        );

        let outcome = h.manager.delete_patient(&h.session, &luis.patient.id).unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted { representatives: 2 });
        assert!(h.store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn delete_archives_patient_with_a_history() {
        let h = harness();
        let ana = seed_patient(&*h.store, h.owner, PatientSeed::named("Ana").consultations(1));

        let outcome = h.manager.delete_patient(&h.session, &ana.patient.id).unwrap();

        assert!(matches!(outcome, DeleteOutcome::Archived { ref report } if report.success));
        assert_eq!(h.store.count(EntityKind::Patient).unwrap(), 1);
        assert!(active_flags(&h.store).iter().all(|a| !a));
    }

    #[test]
    fn root_failure_surfaces_as_error_with_partial_report() {
        let inner = MemoryStore::new();
        let owner = PractitionerId::new();
        let ana = seed_patient(&inner, owner, PatientSeed::named("Ana").consultations(2));
        let store = Arc::new(FlakyStore::new(&inner).fail_updates_of(ana.patient.id));
        let sink = Arc::new(CollectingSink::new());
        let manager = ArchiveLifecycleManager::new(Arc::new(test_config()), store, sink.clone());

        let err = manager
            .archive_patient(&StaticSession::authenticated(owner), &ana.patient.id)
            .expect_err("root update fails");

        let PracticeError::RootUpdateFailure { kind, report, .. } = err else {
            panic!("expected RootUpdateFailure");
        };
        assert_eq!(kind, EntityKind::Patient);
        assert!(!report.success);
        assert_eq!(report.changed.consultations, 2);

        let notices = sink.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.contains("archive patient"));
    }

    #[test]
    fn dependent_failures_produce_a_warning_notice() {
        let inner = MemoryStore::new();
        let owner = PractitionerId::new();
        let ana = seed_patient(
            &inner,
            owner,
            PatientSeed::named("Ana").consultations(2).representatives(1),
        );
        let store = Arc::new(FlakyStore::new(&inner).fail_updates_of(ana.consultations[1].id));
        let sink = Arc::new(CollectingSink::new());
        let manager = ArchiveLifecycleManager::new(Arc::new(test_config()), store, sink.clone());

        let report = manager
            .archive_patient(&StaticSession::authenticated(owner), &ana.patient.id)
            .unwrap();
        assert!(report.success);

        let notices = sink.take();
        let levels: Vec<_> = notices.iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![NoticeLevel::Success, NoticeLevel::Warning]);
        assert_eq!(
            notices[1].message,
            "1 related record(s) could not be archived: 1 consultation"
        );
    }
}
