//! Session access for lifecycle operations.
//!
//! Every operation receives the session explicitly and asks it for the current practitioner.
//! There is no ambient, process-wide session.

use crate::models::PractitionerId;
use crate::{PracticeError, PracticeResult};

/// The authenticated practitioner behind a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub id: PractitionerId,
}

/// Source of the current practitioner, implemented by whatever owns authentication.
pub trait SessionProvider {
    fn current_user(&self) -> Option<SessionUser>;
}

/// A session fixed at construction time, as produced by request authentication or the CLI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticSession(Option<SessionUser>);

impl StaticSession {
    pub fn authenticated(id: PractitionerId) -> Self {
        Self(Some(SessionUser { id }))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl SessionProvider for StaticSession {
    fn current_user(&self) -> Option<SessionUser> {
        self.0.clone()
    }
}

/// Returns the current practitioner or [`PracticeError::Unauthenticated`].
pub fn require_user(session: &dyn SessionProvider) -> PracticeResult<SessionUser> {
    session.current_user().ok_or(PracticeError::Unauthenticated)
}
