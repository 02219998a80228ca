//! Field-level validation failures raised by domain constructors.
//!
//! Constructors return [`ValidationError`] so callers can report which field
//! failed and why. Conversion into [`Error`] yields an `invalid_request`
//! carrying `{ field, code }` details.

use serde_json::json;

use super::Error;

/// A single invalid field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    field: &'static str,
    code: &'static str,
    message: String,
}

impl ValidationError {
    /// Build a validation failure for `field`.
    pub fn new(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            code,
            message: message.into(),
        }
    }

    /// Name of the offending field in request casing.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        self.field
    }

    /// Stable machine-readable reason.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        Self::invalid_request(value.message.clone()).with_details(json!({
            "field": value.field,
            "code": value.code,
        }))
    }
}

/// Trim `value` and require `1..=max` characters.
///
/// # Errors
/// Returns the `empty` or `too_long` codes.
pub fn bounded_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(
            field,
            "empty",
            format!("{field} must not be empty"),
        ));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::new(
            field,
            "too_long",
            format!("{field} must be at most {max} characters"),
        ));
    }
    Ok(trimmed.to_owned())
}

/// Like [`bounded_text`] but maps blank input to `None`.
///
/// # Errors
/// Returns `too_long` when the trimmed value exceeds `max` characters.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => bounded_text(field, text, max).map(Some),
    }
}
