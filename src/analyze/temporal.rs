//! Temporal format pattern self-validation
//!
//! Patterns use chrono's strftime syntax. A pattern is validated once at
//! discovery time; the emitter then shares one pattern constant per
//! distinct pattern within a generated module.

use chrono::format::{Item, StrftimeItems};

use crate::error::{MapGenError, Result};

/// Whether a strftime pattern parses cleanly
#[must_use]
pub fn validate_pattern(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Require a declared, valid pattern for a temporal<->string field pair
pub fn require_pattern(field_name: &str, pattern: Option<&str>) -> Result<String> {
    let pattern = pattern.ok_or_else(|| MapGenError::MissingTemporalFormat {
        field: field_name.to_string(),
    })?;
    if !validate_pattern(pattern) {
        return Err(MapGenError::InvalidTemporalFormat {
            field: field_name.to_string(),
            pattern: pattern.to_string(),
        });
    }
    Ok(pattern.to_string())
}
