//! Error type shared by every driven persistence port.

use tracing::error;

use crate::domain::Error;

use super::define_port_error;

define_port_error! {
    /// Failures reported by persistence adapters.
    pub enum RepositoryError {
        /// The store could not be reached.
        Connection => "repository connection failed",
        /// A query or mutation failed.
        Query => "repository query failed",
        /// A uniqueness or referential constraint rejected the write.
        Conflict => "repository conflict",
    }
}

impl From<RepositoryError> for Error {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Connection { message } => {
                Self::service_unavailable(format!("storage unavailable: {message}"))
            }
            RepositoryError::Conflict { message } => Self::conflict(message),
            RepositoryError::Query { message } => {
                error!(%message, "repository query failed");
                Self::internal(format!("storage error: {message}"))
            }
        }
    }
}
