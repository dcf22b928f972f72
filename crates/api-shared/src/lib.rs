//! # API Shared
//!
//! Shared utilities and definitions for MediDesk APIs.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - Authentication utilities (practitioner header to session)
//!
//! Used by `api-rest`; the wire types here are the only place core types are mapped to JSON
//! shapes.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{session_from_header, AuthError, PRACTITIONER_HEADER};
pub use dto::*;
pub use health::HealthService;
