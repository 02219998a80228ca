//! Test doubles shared by unit and integration tests.
//!
//! Compiled for `cfg(test)` and for the `test-support` feature, which the
//! integration suites under `tests/` enable.

mod memory_store;

pub use memory_store::MemoryStore;

use std::sync::{Arc, Mutex, MutexGuard};

use argon2::Params;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{PasswordHasher, UserRepository};
use crate::domain::{DisplayName, EmailAddress, Error, Password, Role, User, UserId};
use crate::inbound::http::state::{HttpState, Repositories};
use crate::outbound::security::Argon2PasswordHasher;

fn fast_hasher() -> Argon2PasswordHasher {
    Argon2PasswordHasher::with_costs(Params::MIN_M_COST, Params::MIN_T_COST, 1).unwrap_or_default()
}

/// Handler state over one shared [`MemoryStore`].
///
/// Passwords are hashed with the cheapest Argon2 parameters so suites stay
/// fast.
#[must_use]
pub fn http_state(store: &Arc<MemoryStore>, clock: Arc<dyn Clock>) -> HttpState {
    let hasher = fast_hasher();
    let repos = Repositories {
        users: store.clone(),
        links: store.clone(),
        protocols: store.clone(),
        prescriptions: store.clone(),
        check_ins: store.clone(),
        habits: store.clone(),
        courses: store.clone(),
        referrals: store.clone(),
        subscriptions: store.clone(),
        clinics: store.clone(),
    };
    HttpState::from_repositories(repos, Arc::new(hasher), clock)
}

/// Insert an account directly, bypassing registration rules.
///
/// Operators cannot self-register, so suites seed them this way.
///
/// # Errors
/// Returns a validation error for malformed input and a conflict when the
/// address is taken.
pub async fn seed_user(
    store: &MemoryStore,
    email: &str,
    password: &str,
    role: Role,
    created_at: DateTime<Utc>,
) -> Result<User, Error> {
    let user = User {
        id: UserId::random(),
        email: EmailAddress::parse(email)?,
        display_name: DisplayName::new(email)?,
        role,
        created_at,
    };
    let hash = fast_hasher()
        .hash(&Password::new(password)?)
        .map_err(|err| Error::internal(err.to_string()))?;
    store.insert(&user, &hash).await?;
    Ok(user)
}

/// A clock tests can move forward.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Clock frozen at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        *self.lock() += TimeDelta::days(days);
    }

    /// Jump to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock() = now;
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock only follows a panicking test; keep its value.
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    fn advancing_moves_utc_forward() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let clock = MutableClock::new(start);
        clock.advance_days(3);
        assert_eq!(clock.utc(), Utc.with_ymd_and_hms(2026, 3, 4, 8, 0, 0).unwrap());
    }
}
