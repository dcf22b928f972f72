//! # MediDesk Core
//!
//! Archive lifecycle management for a medical practice: patients, their representatives,
//! medical histories, consultations and prescriptions, all soft-deleted through one `active`
//! flag per row and kept consistent by a single engine.
//!
//! The pieces, leaf first:
//! - [`store`]: row-level persistence (`MemoryStore`, sharded `YamlStore`).
//! - [`ownership`]: confirms a record belongs to the requesting practitioner.
//! - [`cascade`]: computes the rows that transition together with a root entity.
//! - [`lifecycle`]: applies archive/restore in dependency order and reports partial failure.
//! - [`duplication`]: detached copies of patients and prescriptions.
//! - [`registration`]: the clinical flows that create rows.
//! - [`manager`]: the session-aware facade over all of the above.
//!
//! **No API concerns**: HTTP handlers and the CLI live in `api-rest` and `cli`.

pub mod cascade;
pub mod config;
pub mod constants;
pub mod duplication;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod models;
pub mod notification;
pub mod ownership;
pub mod registration;
pub mod session;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use cascade::{CascadeResolver, CascadeRoot, CascadeSet, RootKind};
pub use config::CoreConfig;
pub use error::{PracticeError, PracticeResult};
pub use lifecycle::{
    CascadePreview, Direction, KindCounts, LifecycleEngine, StepFailure, TransitionReport,
};
pub use manager::{ArchiveLifecycleManager, Confirmation, DeleteOutcome, Outcome};
pub use notification::{CollectingSink, Notice, NoticeLevel, NotificationSink, TracingSink};
pub use ownership::{Authorization, OwnershipVerifier};
pub use registration::{
    NewConsultation, NewPatient, NewPrescription, NewRepresentative, RegisteredPatient,
};
pub use session::{SessionProvider, SessionUser, StaticSession};
pub use store::{EntityStore, MemoryStore, StoreError, YamlStore};

pub use medidesk_uuid::RecordId;
