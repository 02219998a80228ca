//! Session cookie configuration read from the environment.
//!
//! Debug builds fall back to safe defaults with a warning. Release builds
//! require every toggle to be set explicitly and the key file to exist.

mod lookup;

use std::path::{Path, PathBuf};

use actix_web::cookie::{Key, SameSite, time::Duration};
use cap_std::{ambient_authority, fs::Dir};
use mockable::Env;
use sha2::{Digest, Sha256};
use tracing::warn;
use zeroize::Zeroize;

use lookup::{
    FLAG_EXPECTED, Lookup, SAMESITE_EXPECTED, TTL_EXPECTED, lenient, parse_flag, parse_same_site,
    parse_ttl_hours,
};

const SESSION_KEY_DEFAULT_PATH: &str = "/var/run/secrets/session_key";
const SESSION_KEY_MIN_LEN: usize = 64;
const DEFAULT_TTL_HOURS: i64 = 12;
/// Digest bytes kept in a key fingerprint.
const FINGERPRINT_BYTES: usize = 8;
pub(crate) const COOKIE_SECURE_ENV: &str = "SESSION_COOKIE_SECURE";
pub(crate) const SAMESITE_ENV: &str = "SESSION_SAMESITE";
pub(crate) const ALLOW_EPHEMERAL_ENV: &str = "SESSION_ALLOW_EPHEMERAL";
pub(crate) const KEY_FILE_ENV: &str = "SESSION_KEY_FILE";
pub(crate) const TTL_HOURS_ENV: &str = "SESSION_TTL_HOURS";

/// Build mode for session configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Defaults are tolerated with warnings.
    Debug,
    /// Every toggle must be present and valid.
    Release,
}

impl BuildMode {
    /// The mode of the running binary.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use careplan::inbound::http::session_config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// assert_eq!(mode == BuildMode::Debug, cfg!(debug_assertions));
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    pub(crate) const fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Validated session cookie settings.
#[derive(Clone)]
pub struct SessionSettings {
    /// Signing and encryption key for cookie sessions.
    pub key: Key,
    /// Whether session cookies are marked `Secure`.
    pub cookie_secure: bool,
    /// `SameSite` policy for session cookies.
    pub same_site: SameSite,
    /// Lifetime of a persistent session cookie.
    pub ttl: Duration,
}

/// Errors raised while validating session configuration.
#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    #[error("SESSION_SAMESITE=None requires SESSION_COOKIE_SECURE=1")]
    InsecureSameSiteNone,
    #[error("SESSION_ALLOW_EPHEMERAL must be 0 in release builds")]
    EphemeralNotAllowed,
}

/// Build session settings from environment variables.
///
/// # Examples
///
/// ```rust
/// use careplan::inbound::http::session_config::{BuildMode, session_settings_from_env};
/// use mockable::MockEnv;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key_file = tempfile::NamedTempFile::new()?;
/// std::fs::write(key_file.path(), vec![b'k'; 64])?;
/// let key_path = key_file.path().to_string_lossy().into_owned();
///
/// let mut env = MockEnv::new();
/// env.expect_string().returning(move |name| match name {
///     "SESSION_KEY_FILE" => Some(key_path.clone()),
///     "SESSION_COOKIE_SECURE" => Some("1".to_owned()),
///     "SESSION_SAMESITE" => Some("Strict".to_owned()),
///     "SESSION_ALLOW_EPHEMERAL" => Some("0".to_owned()),
///     "SESSION_TTL_HOURS" => Some("8".to_owned()),
///     _ => None,
/// });
///
/// let settings = session_settings_from_env(&env, BuildMode::Release)?;
/// assert!(settings.cookie_secure);
/// # Ok(())
/// # }
/// ```
pub fn session_settings_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<SessionSettings, SessionConfigError> {
    let lookup = Lookup::new(env, mode);
    let default_same_site = match mode {
        BuildMode::Debug => SameSite::Lax,
        BuildMode::Release => SameSite::Strict,
    };

    let cookie_secure = lookup.required(COOKIE_SECURE_ENV, true, parse_flag, FLAG_EXPECTED)?;
    let mut same_site =
        lookup.required(SAMESITE_ENV, default_same_site, parse_same_site, SAMESITE_EXPECTED)?;
    if same_site == SameSite::None && !cookie_secure {
        same_site = lenient(
            mode,
            SameSite::None,
            SessionConfigError::InsecureSameSiteNone,
            || warn!("SameSite=None on an insecure cookie; browsers may drop it"),
        )?;
    }
    let allow_ephemeral = lookup.required(ALLOW_EPHEMERAL_ENV, false, parse_flag, FLAG_EXPECTED)?;
    if allow_ephemeral && mode == BuildMode::Release {
        return Err(SessionConfigError::EphemeralNotAllowed);
    }
    let ttl = lookup.optional(
        TTL_HOURS_ENV,
        Duration::hours(DEFAULT_TTL_HOURS),
        parse_ttl_hours,
        TTL_EXPECTED,
    )?;
    let key = session_key_from_env(env, mode, allow_ephemeral)?;

    Ok(SessionSettings {
        key,
        cookie_secure,
        same_site,
        ttl,
    })
}

/// Short hex digest of the key's master material.
///
/// Replicas sharing a key log the same value at startup; the key itself
/// never reaches the logs.
///
/// # Examples
///
/// ```rust
/// use actix_web::cookie::Key;
/// use careplan::inbound::http::session_config::key_fingerprint;
///
/// let key = Key::derive_from(&[7; 64]);
/// assert_eq!(key_fingerprint(&key), key_fingerprint(&key.clone()));
/// assert_eq!(key_fingerprint(&key).len(), 16);
/// ```
#[must_use]
pub fn key_fingerprint(key: &Key) -> String {
    let digest = Sha256::digest(key.master());
    hex::encode(digest.get(..FINGERPRINT_BYTES).unwrap_or_default())
}

fn session_key_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
    allow_ephemeral: bool,
) -> Result<Key, SessionConfigError> {
    let path = PathBuf::from(
        env.string(KEY_FILE_ENV)
            .unwrap_or_else(|| SESSION_KEY_DEFAULT_PATH.to_owned()),
    );

    match read_key_file(&path) {
        Ok(mut bytes) => {
            let length = bytes.len();
            if length < SESSION_KEY_MIN_LEN {
                bytes.zeroize();
                // Key derivation panics below 32 bytes, so short keys are
                // never used even in debug builds.
                return lenient(
                    mode,
                    Key::generate(),
                    SessionConfigError::KeyTooShort {
                        path: path.clone(),
                        length,
                        min_len: SESSION_KEY_MIN_LEN,
                    },
                    || {
                        warn!(
                            path = %path.display(),
                            length,
                            "session key too short; using temporary key"
                        );
                    },
                );
            }
            let key = Key::derive_from(&bytes);
            bytes.zeroize();
            Ok(key)
        }
        Err(error) if mode.is_debug() || allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using temporary session key (dev only)"
            );
            Ok(Key::generate())
        }
        Err(error) => Err(SessionConfigError::KeyRead {
            path,
            source: error,
        }),
    }
}

fn read_key_file(path: &Path) -> std::io::Result<Vec<u8>> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "session key path has no file name",
        )
    })?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.read(file_name)
}
