//! Input validation utilities.
//!
//! Functions here check user inputs before they are turned into stored rows.

use crate::constants::MAX_NATIONAL_ID_LEN;
use crate::{PracticeError, PracticeResult};
use chrono::{Datelike, NaiveDate};

/// Whole years between `birth` and `today`. Returns 0 for birth dates in the future.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    if birth > today {
        return 0;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Rejects birth dates in the future.
pub fn validate_birth_date(birth: NaiveDate, today: NaiveDate) -> PracticeResult<()> {
    if birth > today {
        return Err(PracticeError::InvalidInput(
            "birth date cannot be in the future".into(),
        ));
    }
    Ok(())
}

/// Normalises and validates a national identifier.
///
/// Blank input means "no national id". Otherwise the value is upper-cased and must be ASCII
/// letters, digits or `-`, at most [`MAX_NATIONAL_ID_LEN`] characters long.
pub fn normalise_national_id(input: Option<&str>) -> PracticeResult<Option<String>> {
    let Some(raw) = input.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if raw.len() > MAX_NATIONAL_ID_LEN {
        return Err(PracticeError::InvalidInput(format!(
            "national id exceeds maximum length of {} characters",
            MAX_NATIONAL_ID_LEN
        )));
    }

    let ok = raw
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-'));
    if !ok {
        return Err(PracticeError::InvalidInput(
            "national id contains invalid characters (only letters, digits and '-' allowed)"
                .into(),
        ));
    }

    Ok(Some(raw.to_ascii_uppercase()))
}

/// Trims optional free text, mapping blank values to `None`.
pub fn normalise_optional(input: Option<String>) -> Option<String> {
    input
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
