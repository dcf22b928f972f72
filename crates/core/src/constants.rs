//! Constants used throughout the MediDesk core crate.
//!
//! Path names, filenames and policy defaults live here so the stores, the
//! configuration layer and the binaries agree on them.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "medidesk_data";

/// Collection directory names for the file-backed store.
pub const PATIENTS_DIR_NAME: &str = "patients";
pub const REPRESENTATIVES_DIR_NAME: &str = "representatives";
pub const MEDICAL_HISTORIES_DIR_NAME: &str = "medical_histories";
pub const CONSULTATIONS_DIR_NAME: &str = "consultations";
pub const PRESCRIPTIONS_DIR_NAME: &str = "prescriptions";

/// Filename of a single stored record inside its sharded directory.
pub const RECORD_FILENAME: &str = "record.yaml";

/// Age (in whole years) from which a patient no longer needs a representative.
pub const DEFAULT_ADULT_AGE: u32 = 18;

/// Marker appended to the display name of a duplicated patient.
pub const DEFAULT_COPY_MARKER: &str = " (Copy)";

/// Prefix of the provenance note written into a duplicated patient's medical history.
pub const DUPLICATED_FROM_PREFIX: &str = "Duplicated from: ";

/// Upper bound for national identifiers accepted at registration.
pub const MAX_NATIONAL_ID_LEN: usize = 32;
