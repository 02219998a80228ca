//! Care team management and the access checks other services share.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{CareLinkRepository, CareTeam, Subscriptions, UserRepository};
use crate::domain::{
    CareLink, EmailAddress, Error, LinkedUser, Page, PageRequest, Principal, Role, UserId,
};

/// Fail unless the doctor cares for the patient.
pub(crate) async fn ensure_linked(
    links: &dyn CareLinkRepository,
    doctor_id: UserId,
    patient_id: UserId,
) -> Result<(), Error> {
    if links.exists(doctor_id, patient_id).await? {
        Ok(())
    } else {
        Err(Error::forbidden("patient is not in your care team"))
    }
}

/// Fail unless the caller may read the patient's records: the patient
/// themself or one of their doctors.
pub(crate) async fn ensure_patient_access(
    links: &dyn CareLinkRepository,
    principal: Principal,
    patient_id: UserId,
) -> Result<(), Error> {
    match principal.role {
        Role::Patient if principal.user_id == patient_id => Ok(()),
        Role::Doctor => ensure_linked(links, principal.user_id, patient_id).await,
        _ => Err(Error::forbidden("no access to this patient's records")),
    }
}

/// The patient a read refers to: the caller for patients, an explicit id
/// for everyone else.
pub(crate) fn subject_patient(
    principal: Principal,
    patient_id: Option<UserId>,
) -> Result<UserId, Error> {
    match (patient_id, principal.role) {
        (Some(patient_id), _) => Ok(patient_id),
        (None, Role::Patient) => Ok(principal.user_id),
        (None, _) => Err(Error::invalid_request("patientId is required")
            .with_details(json!({ "field": "patientId", "code": "missing" }))),
    }
}

/// Care team service implementing [`CareTeam`].
#[derive(Clone)]
pub struct CareTeamService {
    users: Arc<dyn UserRepository>,
    links: Arc<dyn CareLinkRepository>,
    subscriptions: Arc<dyn Subscriptions>,
    clock: Arc<dyn Clock>,
}

impl CareTeamService {
    /// Create the service.
    pub fn new(
        users: Arc<dyn UserRepository>,
        links: Arc<dyn CareLinkRepository>,
        subscriptions: Arc<dyn Subscriptions>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            links,
            subscriptions,
            clock,
        }
    }

    async fn ensure_capacity(&self, doctor_id: UserId) -> Result<(), Error> {
        let Some(limit) = self.subscriptions.patient_limit(doctor_id).await? else {
            return Ok(());
        };
        let linked = self.links.count_patients(doctor_id).await?;
        if linked >= u64::from(limit) {
            return Err(
                Error::forbidden("patient limit of the current plan reached").with_details(json!({
                    "code": "patient_limit_reached",
                    "limit": limit,
                })),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl CareTeam for CareTeamService {
    async fn link_patient(
        &self,
        principal: Principal,
        email: EmailAddress,
    ) -> Result<LinkedUser, Error> {
        principal.require_doctor()?;
        let patient = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| Error::not_found("no account registered with that email"))?;
        if patient.role != Role::Patient {
            return Err(Error::invalid_request("only patients can join a care team")
                .with_details(json!({ "field": "email", "code": "not_a_patient" })));
        }
        if self.links.exists(principal.user_id, patient.id).await? {
            return Err(Error::conflict("patient is already in your care team"));
        }
        self.ensure_capacity(principal.user_id).await?;

        let link = CareLink {
            doctor_id: principal.user_id,
            patient_id: patient.id,
            created_at: self.clock.utc(),
        };
        self.links.insert(&link).await?;
        info!(doctor_id = %link.doctor_id, patient_id = %link.patient_id, "patient linked");
        Ok(LinkedUser {
            user: patient,
            linked_at: link.created_at,
        })
    }

    async fn unlink_patient(&self, principal: Principal, patient_id: UserId) -> Result<(), Error> {
        principal.require_doctor()?;
        if self.links.delete(principal.user_id, patient_id).await? {
            info!(doctor_id = %principal.user_id, %patient_id, "patient unlinked");
            Ok(())
        } else {
            Err(Error::not_found("care link not found"))
        }
    }

    async fn list_patients(
        &self,
        principal: Principal,
        page: PageRequest,
    ) -> Result<Page<LinkedUser>, Error> {
        principal.require_doctor()?;
        Ok(self.links.list_patients(principal.user_id, page).await?)
    }

    async fn list_doctors(&self, principal: Principal) -> Result<Vec<LinkedUser>, Error> {
        principal.require_patient()?;
        Ok(self.links.list_doctors(principal.user_id).await?)
    }
}

#[cfg(test)]
#[path = "care_team_service_tests.rs"]
mod tests;
