//! Readers for single session variables.
//!
//! A [`Lookup`] knows the build mode, so callers only say what a variable
//! means. Debug builds swap absent or malformed values for the default and
//! warn; release builds turn them into [`SessionConfigError`]s.

use actix_web::cookie::{SameSite, time::Duration};
use mockable::Env;
use tracing::warn;

use super::{BuildMode, SessionConfigError};

pub(super) const FLAG_EXPECTED: &str = "1|0|true|false|yes|no|y|n";
pub(super) const SAMESITE_EXPECTED: &str = "Strict|Lax|None";
pub(super) const TTL_EXPECTED: &str = "an integer number of hours between 1 and 720";

const MAX_TTL_HOURS: i64 = 24 * 30;

pub(super) struct Lookup<'a, E> {
    env: &'a E,
    mode: BuildMode,
}

impl<'a, E: Env> Lookup<'a, E> {
    pub(super) const fn new(env: &'a E, mode: BuildMode) -> Self {
        Self { env, mode }
    }

    /// A variable release builds must set.
    pub(super) fn required<T>(
        &self,
        name: &'static str,
        default: T,
        parse: impl FnOnce(&str) -> Option<T>,
        expected: &'static str,
    ) -> Result<T, SessionConfigError> {
        match self.env.string(name) {
            Some(raw) => self.parsed(name, raw, default, parse, expected),
            None => lenient(
                self.mode,
                default,
                SessionConfigError::MissingEnv { name },
                || warn!(variable = name, "not set; using default"),
            ),
        }
    }

    /// A variable whose default is acceptable in every build.
    pub(super) fn optional<T>(
        &self,
        name: &'static str,
        default: T,
        parse: impl FnOnce(&str) -> Option<T>,
        expected: &'static str,
    ) -> Result<T, SessionConfigError> {
        match self.env.string(name) {
            Some(raw) => self.parsed(name, raw, default, parse, expected),
            None => Ok(default),
        }
    }

    fn parsed<T>(
        &self,
        name: &'static str,
        raw: String,
        default: T,
        parse: impl FnOnce(&str) -> Option<T>,
        expected: &'static str,
    ) -> Result<T, SessionConfigError> {
        if let Some(value) = parse(&raw) {
            return Ok(value);
        }
        let warn_raw = raw.clone();
        lenient(
            self.mode,
            default,
            SessionConfigError::InvalidEnv {
                name,
                value: raw,
                expected,
            },
            || warn!(variable = name, value = %warn_raw, "invalid value; using default"),
        )
    }
}

/// `fallback` after `warn_fn` in debug builds, `error` in release builds.
pub(super) fn lenient<T>(
    mode: BuildMode,
    fallback: T,
    error: SessionConfigError,
    warn_fn: impl FnOnce(),
) -> Result<T, SessionConfigError> {
    match mode {
        BuildMode::Debug => {
            warn_fn();
            Ok(fallback)
        }
        BuildMode::Release => Err(error),
    }
}

pub(super) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

pub(super) fn parse_same_site(raw: &str) -> Option<SameSite> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "strict" => Some(SameSite::Strict),
        "lax" => Some(SameSite::Lax),
        "none" => Some(SameSite::None),
        _ => None,
    }
}

pub(super) fn parse_ttl_hours(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|hours| (1..=MAX_TTL_HOURS).contains(hours))
        .map(Duration::hours)
}
