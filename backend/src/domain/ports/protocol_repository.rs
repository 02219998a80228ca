//! Port for protocol persistence.

use async_trait::async_trait;

use crate::domain::{Page, PageRequest, Protocol, ProtocolId, UserId};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProtocolRepository: Send + Sync {
    /// Insert or replace a protocol.
    async fn save(&self, protocol: &Protocol) -> Result<(), RepositoryError>;

    /// Fetch a protocol.
    async fn find(&self, id: ProtocolId) -> Result<Option<Protocol>, RepositoryError>;

    /// Delete a protocol, reporting whether it existed.
    async fn delete(&self, id: ProtocolId) -> Result<bool, RepositoryError>;

    /// Protocols authored by a doctor, newest first.
    async fn list_for_doctor(
        &self,
        doctor_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Protocol>, RepositoryError>;
}
