//! Driving port for protocol authoring.

use async_trait::async_trait;

use crate::domain::{Error, Page, PageRequest, Principal, Protocol, ProtocolContent, ProtocolId};

/// Protocol use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Protocols: Send + Sync {
    /// Author a protocol.
    async fn create(&self, principal: Principal, content: ProtocolContent)
    -> Result<Protocol, Error>;

    /// Replace a protocol's content while nobody is running it.
    async fn update(
        &self,
        principal: Principal,
        id: ProtocolId,
        content: ProtocolContent,
    ) -> Result<Protocol, Error>;

    /// Delete a protocol that was never prescribed.
    async fn delete(&self, principal: Principal, id: ProtocolId) -> Result<(), Error>;

    /// Read a protocol as its author, an operator or a patient running it.
    async fn get(&self, principal: Principal, id: ProtocolId) -> Result<Protocol, Error>;

    /// The calling doctor's protocols.
    async fn list_mine(
        &self,
        principal: Principal,
        page: PageRequest,
    ) -> Result<Page<Protocol>, Error>;
}
