//! Actix middleware shared by the server binary and the integration tests.

pub mod trace;

pub use trace::{TRACE_ID_HEADER, Trace};
