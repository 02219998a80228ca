//! Correlation id for the request currently being handled.
//!
//! The id sits in tokio task-local storage for the duration of a request, so
//! [`crate::domain::Error`] can stamp itself without every service taking an
//! extra argument. Spawned tasks do not inherit it.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use uuid::Uuid;

tokio::task_local! {
    static CURRENT: TraceId;
}

/// Random per-request identifier, rendered as a hyphenated UUID.
///
/// # Examples
/// ```
/// use careplan::TraceId;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let id = TraceId::generate();
/// assert_eq!(TraceId::scope(id, async { TraceId::current() }).await, Some(id));
/// assert_eq!(TraceId::current(), None);
/// # });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(Uuid);

impl TraceId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id of the request being handled on this task.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT.try_with(|id| *id).ok()
    }

    /// Drive `fut` to completion with `self` as the current id.
    pub async fn scope<F: Future>(id: Self, fut: F) -> F::Output {
        CURRENT.scope(id, fut).await
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}
