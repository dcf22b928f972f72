//! Record identifiers and sharded-path utilities.
//!
//! MediDesk identifies every stored row (patients, histories, consultations, prescriptions,
//! representatives) and every practitioner with a *canonical* UUID representation:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - A wrapper type ([`RecordId`]) that guarantees the canonical format once constructed.
//! - The sharding logic the file-backed store uses to derive a record's directory.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Externally supplied identifiers (CLI arguments, REST path segments, headers) must already be
//! canonical; [`RecordId::parse`] rejects hyphenated or uppercase input.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, records live under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `medidesk_data/patients/55/0e/550e8400e29b41d4a716446655440000/`

mod id;

pub use id::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
