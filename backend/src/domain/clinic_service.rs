//! Clinic creation and membership management.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{ClinicRepository, ClinicSummary, Clinics, UserRepository};
use crate::domain::{
    Clinic, ClinicId, ClinicMember, ClinicMembership, ClinicRole, EmailAddress, Error,
    MembershipRuleError, Principal, Role, UserId, clinic,
};

fn map_rule_error(error: MembershipRuleError) -> Error {
    match error {
        MembershipRuleError::NotManager | MembershipRuleError::OwnerRequired => {
            Error::forbidden(error.to_string())
        }
        MembershipRuleError::LastOwner => {
            Error::conflict(error.to_string()).with_details(json!({ "code": "last_owner" }))
        }
    }
}

fn owner_count(count: u64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// Clinic service implementing [`Clinics`].
#[derive(Clone)]
pub struct ClinicService {
    clinics: Arc<dyn ClinicRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl ClinicService {
    /// Create the service.
    pub fn new(
        clinics: Arc<dyn ClinicRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            clinics,
            users,
            clock,
        }
    }

    /// The caller's membership, failing when the clinic is unknown or the
    /// caller is not part of it.
    async fn actor_membership(
        &self,
        principal: Principal,
        clinic_id: ClinicId,
    ) -> Result<ClinicMembership, Error> {
        principal.require_doctor()?;
        if self.clinics.find(clinic_id).await?.is_none() {
            return Err(Error::not_found("clinic not found"));
        }
        self.clinics
            .membership(clinic_id, principal.user_id)
            .await?
            .ok_or_else(|| Error::forbidden("you are not a member of this clinic"))
    }

    async fn target_membership(
        &self,
        clinic_id: ClinicId,
        doctor_id: UserId,
    ) -> Result<ClinicMembership, Error> {
        self.clinics
            .membership(clinic_id, doctor_id)
            .await?
            .ok_or_else(|| Error::not_found("member not found"))
    }

    async fn member(&self, membership: ClinicMembership) -> Result<ClinicMember, Error> {
        let user = self
            .users
            .find_by_id(membership.doctor_id)
            .await?
            .ok_or_else(|| Error::not_found("member account not found"))?;
        Ok(ClinicMember { membership, user })
    }
}

#[async_trait]
impl Clinics for ClinicService {
    async fn create(&self, principal: Principal, name: String) -> Result<ClinicSummary, Error> {
        principal.require_doctor()?;
        let now = self.clock.utc();
        let clinic = Clinic::create(&name, principal.user_id, now)?;
        let owner = ClinicMembership {
            clinic_id: clinic.id,
            doctor_id: principal.user_id,
            role: ClinicRole::Owner,
            joined_at: now,
        };
        self.clinics.create(&clinic, &owner).await?;
        info!(clinic_id = %clinic.id, owner_id = %owner.doctor_id, "clinic created");
        Ok(ClinicSummary {
            clinic,
            role: ClinicRole::Owner,
        })
    }

    async fn list_mine(&self, principal: Principal) -> Result<Vec<ClinicSummary>, Error> {
        principal.require_doctor()?;
        Ok(self
            .clinics
            .clinics_for(principal.user_id)
            .await?
            .into_iter()
            .map(|(clinic, role)| ClinicSummary { clinic, role })
            .collect())
    }

    async fn members(
        &self,
        principal: Principal,
        clinic_id: ClinicId,
    ) -> Result<Vec<ClinicMember>, Error> {
        self.actor_membership(principal, clinic_id).await?;
        Ok(self.clinics.members(clinic_id).await?)
    }

    async fn add_member(
        &self,
        principal: Principal,
        clinic_id: ClinicId,
        email: EmailAddress,
        role: ClinicRole,
    ) -> Result<ClinicMember, Error> {
        let actor = self.actor_membership(principal, clinic_id).await?;
        clinic::check_add(actor.role, role).map_err(map_rule_error)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| Error::not_found("no account registered with that email"))?;
        if user.role != Role::Doctor {
            return Err(Error::invalid_request("only doctors can join a clinic")
                .with_details(json!({ "field": "email", "code": "not_a_doctor" })));
        }
        if self.clinics.membership(clinic_id, user.id).await?.is_some() {
            return Err(Error::conflict("doctor is already a member of this clinic"));
        }
        let membership = ClinicMembership {
            clinic_id,
            doctor_id: user.id,
            role,
            joined_at: self.clock.utc(),
        };
        self.clinics.add_member(&membership).await?;
        info!(%clinic_id, doctor_id = %user.id, %role, "clinic member added");
        Ok(ClinicMember { membership, user })
    }

    async fn change_role(
        &self,
        principal: Principal,
        clinic_id: ClinicId,
        doctor_id: UserId,
        role: ClinicRole,
    ) -> Result<ClinicMember, Error> {
        let actor = self.actor_membership(principal, clinic_id).await?;
        let mut target = self.target_membership(clinic_id, doctor_id).await?;
        let owners = owner_count(self.clinics.count_owners(clinic_id).await?);
        clinic::check_role_change(actor.role, target.role, role, owners)
            .map_err(map_rule_error)?;
        if target.role != role {
            self.clinics.update_role(clinic_id, doctor_id, role).await?;
            info!(
                %clinic_id,
                %doctor_id,
                from = %target.role,
                to = %role,
                "clinic role changed"
            );
            target.role = role;
        }
        self.member(target).await
    }

    async fn remove_member(
        &self,
        principal: Principal,
        clinic_id: ClinicId,
        doctor_id: UserId,
    ) -> Result<(), Error> {
        let actor = self.actor_membership(principal, clinic_id).await?;
        let target = self.target_membership(clinic_id, doctor_id).await?;
        let owners = owner_count(self.clinics.count_owners(clinic_id).await?);
        let is_self = doctor_id == principal.user_id;
        clinic::check_removal(actor.role, target.role, is_self, owners)
            .map_err(map_rule_error)?;
        if !self.clinics.remove_member(clinic_id, doctor_id).await? {
            return Err(Error::not_found("member not found"));
        }
        info!(%clinic_id, %doctor_id, "clinic member removed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "clinic_service_tests.rs"]
mod tests;
