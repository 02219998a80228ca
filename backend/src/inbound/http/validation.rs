//! Shared validation helpers for inbound HTTP adapters.
//!
//! Failures become `invalid_request` errors with `{ field, code, value? }`
//! details so clients can point at the offending input.

use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::json;

use crate::domain::Error;

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidDate,
    InvalidValue,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidDate => "invalid_date",
            Self::InvalidValue => "invalid_value",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, code: ErrorCode, message: String, value: Option<&str>) -> Error {
    let mut details = json!({
        "field": field.as_str(),
        "code": code.as_str(),
    });
    if let (Some(value), Some(map)) = (value, details.as_object_mut()) {
        map.insert("value".to_owned(), json!(value));
    }
    Error::invalid_request(message).with_details(details)
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(
        field,
        ErrorCode::MissingField,
        format!("missing required field: {name}"),
        None,
    )
}

/// Require an optional body field.
pub(crate) fn required<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

/// Parse a path or query identifier.
pub(crate) fn parse_id<T>(value: &str, field: FieldName) -> Result<T, Error>
where
    T: FromStr<Err = uuid::Error>,
{
    value.parse().map_err(|_| {
        let name = field.as_str();
        field_error(
            field,
            ErrorCode::InvalidUuid,
            format!("{name} must be a valid UUID"),
            Some(value),
        )
    })
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub(crate) fn parse_date(value: &str, field: FieldName) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        let name = field.as_str();
        field_error(
            field,
            ErrorCode::InvalidDate,
            format!("{name} must be a date formatted as YYYY-MM-DD"),
            Some(value),
        )
    })
}

pub(crate) fn parse_optional_date(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<NaiveDate>, Error> {
    value.map(|raw| parse_date(raw, field)).transpose()
}

/// Parse an upper-case enumeration value such as a role or status.
pub(crate) fn parse_enum<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value.trim().parse().map_err(|_| {
        let name = field.as_str();
        field_error(
            field,
            ErrorCode::InvalidValue,
            format!("{name} has an unsupported value"),
            Some(value),
        )
    })
}

pub(crate) fn parse_optional_enum<T: FromStr>(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<T>, Error> {
    value.map(|raw| parse_enum(raw, field)).transpose()
}

/// Narrow an integer into a smaller type, rejecting overflow.
pub(crate) fn narrow<T, U>(value: T, field: FieldName) -> Result<U, Error>
where
    T: Copy + ToString,
    U: TryFrom<T>,
{
    U::try_from(value).map_err(|_| {
        let name = field.as_str();
        field_error(
            field,
            ErrorCode::InvalidValue,
            format!("{name} is out of range"),
            Some(&value.to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode as DomainCode, PrescriptionStatus, UserId};
    use rstest::rstest;
    use serde_json::Value;

    fn details(err: &Error) -> &serde_json::Map<String, Value> {
        err.details()
            .and_then(Value::as_object)
            .expect("details object")
    }

    #[rstest]
    fn invalid_ids_report_field_and_value() {
        let err = parse_id::<UserId>("nope", FieldName::new("patientId")).expect_err("invalid");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
        let details = details(&err);
        assert_eq!(details.get("field"), Some(&json!("patientId")));
        assert_eq!(details.get("code"), Some(&json!("invalid_uuid")));
        assert_eq!(details.get("value"), Some(&json!("nope")));
    }

    #[rstest]
    #[case("2026-02-29", false)]
    #[case("2028-02-29", true)]
    #[case("29/02/2028", false)]
    fn dates_are_strict(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(parse_date(raw, FieldName::new("date")).is_ok(), valid);
    }

    #[rstest]
    fn enums_parse_wire_names() {
        let status: PrescriptionStatus =
            parse_enum("PAUSED", FieldName::new("status")).expect("known status");
        assert_eq!(status, PrescriptionStatus::Paused);
        let err = parse_enum::<PrescriptionStatus>("paused-ish", FieldName::new("status"))
            .expect_err("unknown status");
        assert_eq!(details(&err).get("code"), Some(&json!("invalid_value")));
    }

    #[rstest]
    fn missing_fields_have_no_value() {
        let err = required::<u8>(None, FieldName::new("plan")).expect_err("missing");
        assert!(details(&err).get("value").is_none());
        assert_eq!(err.message(), "missing required field: plan");
    }

    #[rstest]
    fn narrowing_rejects_overflow() {
        let ok: u16 = narrow(12_u32, FieldName::new("dayNumber")).expect("fits");
        assert_eq!(ok, 12);
        assert!(narrow::<u32, u16>(70_000, FieldName::new("dayNumber")).is_err());
    }
}
