//! Protocol authoring.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{PrescriptionRepository, ProtocolRepository, Protocols};
use crate::domain::{
    Error, Page, PageRequest, Principal, Protocol, ProtocolContent, ProtocolId, Role,
};

/// Protocol service implementing [`Protocols`].
#[derive(Clone)]
pub struct ProtocolService {
    protocols: Arc<dyn ProtocolRepository>,
    prescriptions: Arc<dyn PrescriptionRepository>,
    clock: Arc<dyn Clock>,
}

impl ProtocolService {
    /// Create the service.
    pub fn new(
        protocols: Arc<dyn ProtocolRepository>,
        prescriptions: Arc<dyn PrescriptionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            protocols,
            prescriptions,
            clock,
        }
    }

    async fn find(&self, id: ProtocolId) -> Result<Protocol, Error> {
        self.protocols
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found("protocol not found"))
    }

    async fn owned(&self, principal: Principal, id: ProtocolId) -> Result<Protocol, Error> {
        principal.require_doctor()?;
        let protocol = self.find(id).await?;
        if protocol.doctor_id == principal.user_id {
            Ok(protocol)
        } else {
            Err(Error::forbidden("only the author may change this protocol"))
        }
    }
}

#[async_trait]
impl Protocols for ProtocolService {
    async fn create(
        &self,
        principal: Principal,
        content: ProtocolContent,
    ) -> Result<Protocol, Error> {
        principal.require_doctor()?;
        let now = self.clock.utc();
        let protocol = Protocol {
            id: ProtocolId::random(),
            doctor_id: principal.user_id,
            content,
            created_at: now,
            updated_at: now,
        };
        self.protocols.save(&protocol).await?;
        info!(protocol_id = %protocol.id, doctor_id = %protocol.doctor_id, "protocol created");
        Ok(protocol)
    }

    async fn update(
        &self,
        principal: Principal,
        id: ProtocolId,
        content: ProtocolContent,
    ) -> Result<Protocol, Error> {
        let existing = self.owned(principal, id).await?;
        let usage = self.prescriptions.protocol_usage(id).await?;
        if usage.running > 0 {
            return Err(
                Error::conflict("protocol is in use by running prescriptions")
                    .with_details(json!({ "code": "protocol_in_use", "running": usage.running })),
            );
        }
        let updated = Protocol {
            content,
            updated_at: self.clock.utc(),
            ..existing
        };
        self.protocols.save(&updated).await?;
        Ok(updated)
    }

    async fn delete(&self, principal: Principal, id: ProtocolId) -> Result<(), Error> {
        self.owned(principal, id).await?;
        let usage = self.prescriptions.protocol_usage(id).await?;
        if usage.total > 0 {
            return Err(Error::conflict("protocol has been prescribed")
                .with_details(json!({ "code": "protocol_prescribed", "prescriptions": usage.total })));
        }
        if self.protocols.delete(id).await? {
            info!(protocol_id = %id, "protocol deleted");
            Ok(())
        } else {
            Err(Error::not_found("protocol not found"))
        }
    }

    async fn get(&self, principal: Principal, id: ProtocolId) -> Result<Protocol, Error> {
        let protocol = self.find(id).await?;
        if protocol.doctor_id == principal.user_id || principal.is_admin() {
            return Ok(protocol);
        }
        if principal.role == Role::Patient
            && self
                .prescriptions
                .patient_holds(principal.user_id, id)
                .await?
        {
            return Ok(protocol);
        }
        Err(Error::forbidden("no access to this protocol"))
    }

    async fn list_mine(
        &self,
        principal: Principal,
        page: PageRequest,
    ) -> Result<Page<Protocol>, Error> {
        principal.require_doctor()?;
        Ok(self
            .protocols
            .list_for_doctor(principal.user_id, page)
            .await?)
    }
}
