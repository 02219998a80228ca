//! Error mapping and conversions shared by the Diesel repositories.

use tracing::{debug, warn};

use crate::domain::PageRequest;
use crate::domain::ports::RepositoryError;

/// Map a Diesel failure onto the port error.
///
/// Unique violations become [`RepositoryError::Conflict`] carrying the
/// constraint name so services can phrase a precise message. Dropped
/// connections become [`RepositoryError::Connection`]; everything else is a
/// query failure.
pub(crate) fn map_diesel_error(error: diesel::result::Error) -> RepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => RepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => RepositoryError::query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let constraint = info.constraint_name().unwrap_or("unique constraint");
            RepositoryError::conflict(format!("duplicate value violates {constraint}"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            warn!(
                message = info.message(),
                constraint_name = ?info.constraint_name(),
                "foreign key violation"
            );
            RepositoryError::conflict("record is still referenced")
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RepositoryError::connection("database connection error")
        }
        _ => RepositoryError::query("database error"),
    }
}

/// Report a stored value that no longer satisfies domain invariants.
pub(crate) fn corrupt_row(what: &str, detail: impl std::fmt::Display) -> RepositoryError {
    warn!(%what, %detail, "stored row failed validation");
    RepositoryError::query(format!("stored {what} is invalid: {detail}"))
}

/// Row limit for a keyset page, one above the page size.
pub(crate) fn fetch_limit(page: &PageRequest) -> i64 {
    i64::try_from(page.fetch_limit()).unwrap_or(i64::MAX)
}

/// Widen a domain day number to the column type.
pub(crate) fn day_to_db(day: u16) -> i32 {
    i32::from(day)
}

/// Narrow a stored day number, rejecting values no plan can hold.
pub(crate) fn day_from_db(what: &str, value: i32) -> Result<u16, RepositoryError> {
    u16::try_from(value).map_err(|_| corrupt_row(what, format!("day {value} out of range")))
}

/// Whether an affected-row count reports a change.
pub(crate) const fn touched(rows: usize) -> bool {
    rows > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn not_found_is_a_query_error() {
        let err = map_diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(err, RepositoryError::Query { .. }));
    }

    #[rstest]
    #[case(0, Ok(0))]
    #[case(365, Ok(365))]
    #[case(-1, Err(()))]
    #[case(70_000, Err(()))]
    fn stored_days_must_fit(#[case] value: i32, #[case] expected: Result<u16, ()>) {
        assert_eq!(day_from_db("day", value).map_err(|_| ()), expected);
    }

    #[rstest]
    fn fetch_limit_overfetches_by_one() {
        assert_eq!(fetch_limit(&PageRequest::new(None, 20)), 21);
    }
}
