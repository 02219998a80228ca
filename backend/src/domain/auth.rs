//! Credential primitives for registration and login.
//!
//! Handlers hand raw strings to these constructors before talking to a port
//! so the domain never sees unvalidated credentials.

use zeroize::Zeroizing;

use super::validation::ValidationError;
use super::{DisplayName, EmailAddress, Role};

/// Minimum accepted password length, in characters.
pub const PASSWORD_MIN: usize = 8;
/// Maximum accepted password length, in characters.
pub const PASSWORD_MAX: usize = 128;

/// Plain-text password wiped from memory on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Accept a new password, enforcing length limits.
    ///
    /// # Errors
    /// Returns `too_short` or `too_long` validation errors.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let length = raw.chars().count();
        if length < PASSWORD_MIN {
            return Err(ValidationError::new(
                "password",
                "too_short",
                format!("password must be at least {PASSWORD_MIN} characters"),
            ));
        }
        if length > PASSWORD_MAX {
            return Err(ValidationError::new(
                "password",
                "too_long",
                format!("password must be at most {PASSWORD_MAX} characters"),
            ));
        }
        Ok(Self(Zeroizing::new(raw.to_owned())))
    }

    /// Borrow the secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// PHC-formatted password hash as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a stored PHC string.
    #[must_use]
    pub const fn new(phc: String) -> Self {
        Self(phc)
    }

    /// Borrow the PHC string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Validated login credentials.
///
/// ## Invariants
/// - `email` is a normalised address.
/// - `password` is non-empty; length limits are not applied so legacy
///   passwords still authenticate.
///
/// # Examples
/// ```
/// use careplan::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("Ada@Example.com", "secret").unwrap();
/// assert_eq!(creds.email().as_str(), "ada@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: EmailAddress,
    password: Password,
}

impl LoginCredentials {
    /// Construct credentials from raw inputs.
    ///
    /// # Errors
    /// Returns a validation error for malformed e-mail or a blank password.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, ValidationError> {
        let email = EmailAddress::parse(email)?;
        if password.is_empty() {
            return Err(ValidationError::new(
                "password",
                "empty",
                "password must not be empty",
            ));
        }
        Ok(Self {
            email,
            password: Password(Zeroizing::new(password.to_owned())),
        })
    }

    /// Address used for the account lookup.
    #[must_use]
    pub const fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Password supplied by the caller.
    #[must_use]
    pub const fn password(&self) -> &Password {
        &self.password
    }
}

/// Validated self-registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Login address.
    pub email: EmailAddress,
    /// Chosen password.
    pub password: Password,
    /// Public name.
    pub display_name: DisplayName,
    /// Requested role; only doctors and patients may self-register.
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("short".to_owned(), "too_short")]
    #[case("x".repeat(PASSWORD_MAX + 1), "too_long")]
    fn password_length_limits(#[case] raw: String, #[case] code: &str) {
        let err = Password::new(&raw).expect_err("out of range password");
        assert_eq!(err.code(), code);
    }

    #[rstest]
    fn password_debug_is_redacted() {
        let password = Password::new("correct horse").expect("valid password");
        assert_eq!(format!("{password:?}"), "Password(***)");
    }

    #[rstest]
    #[case("", "pw", "malformed")]
    #[case("ada@example.com", "", "empty")]
    fn invalid_credentials(#[case] email: &str, #[case] password: &str, #[case] code: &str) {
        let err = LoginCredentials::try_from_parts(email, password).expect_err("invalid input");
        assert_eq!(err.code(), code);
    }

    #[rstest]
    fn login_keeps_short_passwords() {
        let creds = LoginCredentials::try_from_parts("ada@example.com", "pw").expect("valid");
        assert_eq!(creds.password().expose(), "pw");
    }
}
