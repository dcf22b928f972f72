//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as
//! `Arc<CoreConfig>`. Services never read process-wide environment variables while handling a
//! request; the binaries do that before constructing the config.

use crate::constants::{DEFAULT_ADULT_AGE, DEFAULT_COPY_MARKER, DEFAULT_DATA_DIR};
use crate::{PracticeError, PracticeResult};
use std::path::{Path, PathBuf};

/// Oldest accepted adult age. Anything above this is treated as a configuration mistake.
const MAX_ADULT_AGE: u32 = 21;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    adult_age: u32,
    copy_marker: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`PracticeError::InvalidInput`] if `adult_age` is zero or implausibly high, or if
    /// `copy_marker` is blank.
    pub fn new(data_dir: PathBuf, adult_age: u32, copy_marker: String) -> PracticeResult<Self> {
        if adult_age == 0 || adult_age > MAX_ADULT_AGE {
            return Err(PracticeError::InvalidInput(format!(
                "adult_age must be between 1 and {MAX_ADULT_AGE}, got {adult_age}"
            )));
        }

        if copy_marker.trim().is_empty() {
            return Err(PracticeError::InvalidInput(
                "copy_marker cannot be empty".into(),
            ));
        }

        Ok(Self {
            data_dir,
            adult_age,
            copy_marker,
        })
    }

    /// Configuration with the default policy values and the given data directory.
    pub fn with_defaults(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            adult_age: DEFAULT_ADULT_AGE,
            copy_marker: DEFAULT_COPY_MARKER.to_string(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn adult_age(&self) -> u32 {
        self.adult_age
    }

    pub fn copy_marker(&self) -> &str {
        &self.copy_marker
    }
}

/// Resolve the data directory from an optional override value.
///
/// Blank overrides fall back to [`DEFAULT_DATA_DIR`] relative to the working directory.
pub fn resolve_data_dir(override_dir: Option<String>) -> PathBuf {
    override_dir
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Parse the adult age from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_ADULT_AGE`].
pub fn adult_age_from_env_value(value: Option<String>) -> PracticeResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_ADULT_AGE),
        Some(v) => v.parse::<u32>().map_err(|_| {
            PracticeError::InvalidInput(format!("adult age must be a whole number, got '{v}'"))
        }),
    }
}
