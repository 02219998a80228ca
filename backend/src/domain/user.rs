//! Accounts, roles and the authenticated principal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, bounded_text};
use super::{Error, UserId};

/// Maximum length of an e-mail address.
pub const EMAIL_MAX: usize = 254;
/// Maximum length of a display name.
pub const DISPLAY_NAME_MAX: usize = 64;

/// Platform role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Authors protocols and courses, cares for patients.
    Doctor,
    /// Runs prescriptions, records check-ins and habits.
    Patient,
    /// Platform operator.
    SuperAdmin,
}

impl Role {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Doctor => "DOCTOR",
            Self::Patient => "PATIENT",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOCTOR" => Ok(Self::Doctor),
            "PATIENT" => Ok(Self::Patient),
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            other => Err(ValidationError::new(
                "role",
                "unknown_role",
                format!("unknown role {other}"),
            )),
        }
    }
}

/// Normalised e-mail address.
///
/// ## Invariants
/// - Lower-cased and trimmed.
/// - Exactly one `@` with non-empty local and domain parts.
/// - The domain part contains a dot that is neither first nor last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and normalise an address.
    ///
    /// # Errors
    /// Returns a `malformed` validation error for addresses failing the
    /// invariants above.
    ///
    /// # Examples
    /// ```
    /// use careplan::domain::EmailAddress;
    ///
    /// let email = EmailAddress::parse("  Ada@Example.COM ").unwrap();
    /// assert_eq!(email.as_str(), "ada@example.com");
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalised = raw.trim().to_lowercase();
        let malformed =
            || ValidationError::new("email", "malformed", "email must be a valid address");
        if normalised.is_empty() || normalised.chars().count() > EMAIL_MAX {
            return Err(malformed());
        }
        if normalised.chars().any(char::is_whitespace) {
            return Err(malformed());
        }
        let (local, domain) = normalised.split_once('@').ok_or_else(malformed)?;
        if local.is_empty() || domain.contains('@') {
            return Err(malformed());
        }
        let dotted = domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2;
        if !dotted || domain.starts_with('.') || domain.ends_with('.') {
            return Err(malformed());
        }
        Ok(Self(normalised))
    }

    /// Borrow the normalised address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Human readable name shown to other users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Trim and require `1..=64` characters.
    ///
    /// # Errors
    /// Returns `empty` or `too_long` validation errors.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        bounded_text("displayName", raw, DISPLAY_NAME_MAX).map(Self)
    }

    /// Borrow the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

/// Registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Unique login address.
    pub email: EmailAddress,
    /// Name shown to other users.
    pub display_name: DisplayName,
    /// Platform role.
    pub role: Role,
    /// Registration instant.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The principal this account authenticates as.
    #[must_use]
    pub const fn principal(&self) -> Principal {
        Principal::new(self.id, self.role)
    }
}

/// The authenticated caller of a use-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// Account identifier.
    pub user_id: UserId,
    /// Role recorded at login.
    pub role: Role,
}

impl Principal {
    /// Build a principal.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether the caller is a platform operator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Require a specific role.
    ///
    /// # Errors
    /// Returns a forbidden error naming the required role.
    pub fn require(&self, role: Role) -> Result<(), Error> {
        if self.role == role {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "{} role required",
                role.as_str().to_lowercase().replace('_', " ")
            )))
        }
    }

    /// Require the doctor role.
    ///
    /// # Errors
    /// Returns forbidden for any other role.
    pub fn require_doctor(&self) -> Result<(), Error> {
        self.require(Role::Doctor)
    }

    /// Require the patient role.
    ///
    /// # Errors
    /// Returns forbidden for any other role.
    pub fn require_patient(&self) -> Result<(), Error> {
        self.require(Role::Patient)
    }

    /// Require the super admin role.
    ///
    /// # Errors
    /// Returns forbidden for any other role.
    pub fn require_admin(&self) -> Result<(), Error> {
        self.require(Role::SuperAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case("ada@example.com")]
    #[case("  Ada.Lovelace@Example.org ")]
    #[case("a+tag@mail.example.co.uk")]
    fn accepts_well_formed_addresses(#[case] raw: &str) {
        let email = EmailAddress::parse(raw).expect("valid address");
        assert_eq!(email.as_str(), raw.trim().to_lowercase());
    }

    #[rstest]
    #[case("")]
    #[case("ada")]
    #[case("@example.com")]
    #[case("ada@")]
    #[case("ada@example")]
    #[case("ada@@example.com")]
    #[case("ada@.example.com")]
    #[case("ada lovelace@example.com")]
    fn rejects_malformed_addresses(#[case] raw: &str) {
        let err = EmailAddress::parse(raw).expect_err("malformed address");
        assert_eq!(err.code(), "malformed");
    }

    #[rstest]
    #[case(Role::Doctor)]
    #[case(Role::Patient)]
    #[case(Role::SuperAdmin)]
    fn role_text_round_trips(#[case] role: Role) {
        assert_eq!(role.as_str().parse::<Role>(), Ok(role));
    }

    #[rstest]
    fn role_serialises_screaming_snake_case() {
        let value = serde_json::to_value(Role::SuperAdmin).expect("serialise role");
        assert_eq!(value, serde_json::json!("SUPER_ADMIN"));
    }

    #[rstest]
    fn display_name_is_trimmed() {
        let name = DisplayName::new("  Dr Grey ").expect("valid name");
        assert_eq!(name.as_str(), "Dr Grey");
    }

    #[rstest]
    fn principal_role_checks() {
        let doctor = Principal::new(UserId::random(), Role::Doctor);
        assert!(doctor.require_doctor().is_ok());
        let err = doctor.require_patient().expect_err("doctor is not a patient");
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(err.message(), "patient role required");
        let err = doctor.require_admin().expect_err("doctor is not an admin");
        assert_eq!(err.message(), "super admin role required");
    }
}
