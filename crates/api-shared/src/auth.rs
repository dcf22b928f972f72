//! Request authentication.
//!
//! Authentication itself happens upstream (a gateway or the practice's identity provider). By
//! the time a request reaches the API it carries the practitioner id in
//! [`PRACTITIONER_HEADER`]; this module turns that header into a session.

use medidesk_core::models::PractitionerId;
use medidesk_core::StaticSession;

/// Header carrying the authenticated practitioner id.
pub const PRACTITIONER_HEADER: &str = "x-practitioner-id";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("malformed x-practitioner-id header")]
    MalformedPractitioner,
}

/// Builds the session for a request.
///
/// A missing or blank header yields an anonymous session, which core operations reject as
/// unauthenticated. A present but malformed header is an error.
pub fn session_from_header(value: Option<&str>) -> Result<StaticSession, AuthError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(StaticSession::anonymous()),
        Some(raw) => PractitionerId::parse(raw)
            .map(StaticSession::authenticated)
            .map_err(|_| AuthError::MalformedPractitioner),
    }
}
