//! Shared fixtures for service unit tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use super::{DisplayName, EmailAddress, Principal, Role, User, UserId};

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

/// 2026-03-10 09:00 UTC.
pub(crate) fn fixture_now() -> DateTime<Utc> {
    at(2026, 3, 10)
}

pub(crate) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .expect("valid fixture instant")
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    clock_at(fixture_now())
}

pub(crate) fn clock_at(utc_now: DateTime<Utc>) -> Arc<dyn Clock> {
    Arc::new(FixtureClock { utc_now })
}

pub(crate) fn user(role: Role, email: &str) -> User {
    User {
        id: UserId::random(),
        email: EmailAddress::parse(email).expect("fixture email"),
        display_name: DisplayName::new("Fixture User").expect("fixture name"),
        role,
        created_at: at(2026, 1, 1),
    }
}

pub(crate) fn doctor() -> Principal {
    Principal::new(UserId::random(), Role::Doctor)
}

pub(crate) fn patient() -> Principal {
    Principal::new(UserId::random(), Role::Patient)
}

pub(crate) fn admin() -> Principal {
    Principal::new(UserId::random(), Role::SuperAdmin)
}
