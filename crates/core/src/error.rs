use crate::lifecycle::{Direction, TransitionReport};
use crate::models::EntityKind;
use crate::store::StoreError;
use medidesk_uuid::RecordId;

#[derive(Debug, thiserror::Error)]
pub enum PracticeError {
    #[error("no authenticated practitioner")]
    Unauthenticated,
    /// The record does not exist or belongs to another practitioner. The two cases are not
    /// distinguished.
    #[error("{kind} not found")]
    NotFound { kind: EntityKind },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] medidesk_types::TextError),
    #[error("invalid id: {0}")]
    Uuid(#[from] medidesk_uuid::UuidError),

    #[error("failed to {direction} {kind} {id}: {reason}")]
    RootUpdateFailure {
        kind: EntityKind,
        id: RecordId,
        direction: Direction,
        reason: String,
        /// Steps that had already been applied before the root failed.
        report: Box<TransitionReport>,
    },
    #[error("{stage} failed after creating {kind} {created_id}: {source}")]
    PartialFailure {
        kind: EntityKind,
        created_id: RecordId,
        stage: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type PracticeResult<T> = std::result::Result<T, PracticeError>;

impl PracticeError {
    /// Maps a store failure on a single insert, turning constraint violations into
    /// validation failures.
    pub(crate) fn from_insert(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { kind, field } => {
                PracticeError::InvalidInput(format!("{kind} with this {field} already exists"))
            }
            other => PracticeError::Store(other),
        }
    }
}
