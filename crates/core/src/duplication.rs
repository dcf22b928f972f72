//! Duplication of patients and prescriptions.
//!
//! A copy is always a fresh, active record with a new id. Patient copies never carry the
//! national id (it is unique per practitioner) and get their own empty medical history. A
//! minor's copy also gets a copy of the primary representative so it still satisfies the
//! registration rule for minors.
//! Prescription copies are detached from any history and dated today.
//!
//! Creation is multi-step without rollback: when a later step fails the error names the row
//! that was already created so the caller can decide what to do with it.

use crate::cascade::RootKind;
use crate::config::CoreConfig;
use crate::constants::DUPLICATED_FROM_PREFIX;
use crate::models::{
    EntityKind, MedicalHistory, Patient, PractitionerId, Prescription, RecordFilter,
    Representative,
};
use crate::ownership::OwnershipVerifier;
use crate::store::{EntityStore, EntityStoreExt};
use crate::{PracticeError, PracticeResult};
use chrono::Utc;
use medidesk_uuid::RecordId;

pub struct DuplicationService<'a, S: ?Sized> {
    store: &'a S,
    cfg: &'a CoreConfig,
}

impl<'a, S: EntityStore + ?Sized> DuplicationService<'a, S> {
    pub fn new(store: &'a S, cfg: &'a CoreConfig) -> Self {
        Self { store, cfg }
    }

    /// Duplicates the root entity and returns the id of the copy.
    pub fn duplicate(
        &self,
        kind: RootKind,
        source_id: &RecordId,
        owner_id: PractitionerId,
    ) -> PracticeResult<RecordId> {
        match kind {
            RootKind::Patient => self.duplicate_patient(source_id, owner_id).map(|p| p.id),
            RootKind::Prescription => self
                .duplicate_prescription(source_id, owner_id)
                .map(|rx| rx.id),
        }
    }

    /// Copies a patient and creates an empty medical history for the copy.
    ///
    /// Representatives of adults are not copied. When the source is a minor its primary
    /// representative (or, lacking one, the most recent) is copied as the copy's primary. The
    /// source may be archived; the copy and its rows are active.
    ///
    /// # Errors
    ///
    /// - [`PracticeError::NotFound`] if the source is missing or foreign.
    /// - [`PracticeError::PartialFailure`] if the history or the representative could not be
    ///   created after the patient copy was stored.
    pub fn duplicate_patient(
        &self,
        source_id: &RecordId,
        owner_id: PractitionerId,
    ) -> PracticeResult<Patient> {
        let source: Patient = OwnershipVerifier::new(self.store).authorize(source_id, owner_id)?;
        let now = Utc::now();

        let copy = Patient {
            id: RecordId::new(),
            full_name: format!("{}{}", source.full_name, self.cfg.copy_marker()),
            national_id: None,
            active: true,
            created_at: now,
            updated_at: now,
            ..source.clone()
        };
        let copy = self
            .store
            .insert_as(copy)
            .map_err(PracticeError::from_insert)?;

        let history = MedicalHistory::empty(
            owner_id,
            copy.id,
            Some(format!("{DUPLICATED_FROM_PREFIX}{}", source.full_name)),
            now,
        );
        if let Err(source_err) = self.store.insert_as(history) {
            return Err(partial_failure(copy.id, "medical history creation", source_err));
        }

        if source.is_minor(now.date_naive(), self.cfg.adult_age()) {
            self.copy_primary_representative(&source, &copy)?;
        }

        tracing::info!("duplicated patient {} as {}", source.id, copy.id);
        Ok(copy)
    }

    fn copy_primary_representative(&self, source: &Patient, copy: &Patient) -> PracticeResult<()> {
        let mut representatives: Vec<Representative> = self
            .store
            .find_as(&RecordFilter::for_patient(source.id))
            .map_err(|e| partial_failure(copy.id, "representative lookup", e))?;
        representatives.sort_by(|a, b| {
            b.primary
                .cmp(&a.primary)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        let Some(primary) = representatives.into_iter().next() else {
            tracing::warn!("minor patient {} has no representative to copy", source.id);
            return Ok(());
        };

        let rep = Representative {
            id: RecordId::new(),
            patient_id: copy.id,
            primary: true,
            active: true,
            created_at: copy.created_at,
            updated_at: copy.created_at,
            ..primary
        };
        self.store
            .insert_as(rep)
            .map_err(|e| partial_failure(copy.id, "representative copy", e))?;
        Ok(())
    }

    /// Copies a prescription's clinical content and patient snapshot as a detached
    /// prescription dated today.
    pub fn duplicate_prescription(
        &self,
        source_id: &RecordId,
        owner_id: PractitionerId,
    ) -> PracticeResult<Prescription> {
        let source: Prescription =
            OwnershipVerifier::new(self.store).authorize(source_id, owner_id)?;
        let now = Utc::now();

        let copy = Prescription {
            id: RecordId::new(),
            medical_history_id: None,
            date_prescribed: now.date_naive(),
            active: true,
            created_at: now,
            updated_at: now,
            ..source.clone()
        };
        let copy = self
            .store
            .insert_as(copy)
            .map_err(PracticeError::from_insert)?;

        tracing::info!("duplicated prescription {} as {}", source.id, copy.id);
        Ok(copy)
    }
}

fn partial_failure(
    created_id: RecordId,
    stage: &'static str,
    source: crate::store::StoreError,
) -> PracticeError {
    tracing::error!("patient copy {created_id} stored but {stage} failed: {source}");
    PracticeError::PartialFailure {
        kind: EntityKind::Patient,
        created_id,
        stage,
        source,
    }
}
