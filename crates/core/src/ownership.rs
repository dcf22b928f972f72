//! Ownership verification.
//!
//! Every mutation starts here. A record that does not exist and a record owned by another
//! practitioner produce the same [`Authorization::Denied`], so callers cannot test for other
//! practitioners' records.

use crate::models::{Entity, EntityKind, PractitionerId, Record};
use crate::store::{EntityStore, StoreResult};
use crate::{PracticeError, PracticeResult};
use medidesk_uuid::RecordId;

#[derive(Clone, Debug, PartialEq)]
pub enum Authorization {
    /// The record, as read during verification.
    Authorized(Record),
    Denied,
}

pub struct OwnershipVerifier<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> OwnershipVerifier<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Looks the record up and compares its owner with `owner_id`. Read-only.
    ///
    /// # Errors
    ///
    /// Only store failures are errors; a missing or foreign record is `Ok(Denied)`.
    pub fn verify_ownership(
        &self,
        kind: EntityKind,
        id: &RecordId,
        owner_id: PractitionerId,
    ) -> StoreResult<Authorization> {
        let authorization = match self.store.get(kind, id)? {
            Some(record) if record.owner_id() == owner_id => Authorization::Authorized(record),
            _ => Authorization::Denied,
        };
        Ok(authorization)
    }

    /// Typed variant that turns a denial into [`PracticeError::NotFound`].
    pub fn authorize<T: Entity>(
        &self,
        id: &RecordId,
        owner_id: PractitionerId,
    ) -> PracticeResult<T> {
        match self.verify_ownership(T::KIND, id, owner_id)? {
            Authorization::Authorized(record) => {
                T::from_record(record).ok_or(PracticeError::NotFound { kind: T::KIND })
            }
            Authorization::Denied => {
                tracing::debug!("ownership check denied for {} {}", T::KIND, id);
                Err(PracticeError::NotFound { kind: T::KIND })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MedicalHistory, Patient};
    use crate::store::{EntityStoreExt, MemoryStore};
    use crate::test_support::{seed_patient, PatientSeed};

    #[test]
    fn owner_is_authorized() {
        let store = MemoryStore::new();
        let owner = PractitionerId::new();
        let seeded = seed_patient(&store, owner, PatientSeed::named("Ana López"));

        let verifier = OwnershipVerifier::new(&store);
        let patient: Patient = verifier
            .authorize(&seeded.patient.id, owner)
            .expect("owner should be authorized");
        assert_eq!(patient.id, seeded.patient.id);
    }

    #[test]
    fn missing_and_foreign_records_are_indistinguishable() {
        let store = MemoryStore::new();
        let owner = PractitionerId::new();
        let intruder = PractitionerId::new();
        let seeded = seed_patient(&store, owner, PatientSeed::named("Ana López"));
        let verifier = OwnershipVerifier::new(&store);

        let foreign = verifier
            .verify_ownership(EntityKind::Patient, &seeded.patient.id, intruder)
            .unwrap();
        let missing = verifier
            .verify_ownership(EntityKind::Patient, &RecordId::new(), owner)
            .unwrap();
        assert_eq!(foreign, Authorization::Denied);
        assert_eq!(missing, Authorization::Denied);
    }

    #[test]
    fn denial_applies_to_every_entity_kind() {
        let store = MemoryStore::new();
        let owner = PractitionerId::new();
        let intruder = PractitionerId::new();
        let seeded = seed_patient(
            &store,
            owner,
            PatientSeed::named("Ana López")
                .consultations(1)
                .prescriptions(1)
                .representatives(1),
        );
        let verifier = OwnershipVerifier::new(&store);

        let rows = [
            (EntityKind::Patient, seeded.patient.id),
            (EntityKind::MedicalHistory, seeded.history_id()),
            (EntityKind::Consultation, seeded.consultations[0].id),
            (EntityKind::Prescription, seeded.prescriptions[0].id),
            (EntityKind::Representative, seeded.representatives[0].id),
        ];
        for (kind, id) in rows {
            assert_eq!(
                verifier.verify_ownership(kind, &id, intruder).unwrap(),
                Authorization::Denied,
                "{kind} should be denied to another practitioner"
            );
            assert!(matches!(
                verifier.verify_ownership(kind, &id, owner).unwrap(),
                Authorization::Authorized(_)
            ));
        }
    }

    #[test]
    fn authorize_maps_denial_to_not_found() {
        let store = MemoryStore::new();
        let owner = PractitionerId::new();
        let seeded = seed_patient(&store, owner, PatientSeed::named("Ana López"));
        let verifier = OwnershipVerifier::new(&store);

        let err = verifier
            .authorize::<MedicalHistory>(&seeded.history_id(), PractitionerId::new())
            .expect_err("foreign history should be denied");
        assert!(matches!(
            err,
            PracticeError::NotFound {
                kind: EntityKind::MedicalHistory
            }
        ));

        let untouched: MedicalHistory = store.get_as(&seeded.history_id()).unwrap().unwrap();
        assert!(untouched.active);
    }
}
