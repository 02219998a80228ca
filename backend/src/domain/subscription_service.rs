//! Doctor subscriptions and the patient-capacity entitlement.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    CareLinkRepository, SubscriptionRepository, SubscriptionView, Subscriptions, UserRepository,
};
use crate::domain::{
    Error, Plan, Principal, Role, Subscription, SubscriptionChangeError, SubscriptionStatus,
    UserId,
};

fn map_change_error(error: SubscriptionChangeError) -> Error {
    let code = match error {
        SubscriptionChangeError::SamePlan(_) => "same_plan",
        SubscriptionChangeError::CancelFree => "free_plan",
        SubscriptionChangeError::AlreadyCancelling => "already_cancelling",
    };
    Error::conflict(error.to_string()).with_details(json!({ "code": code }))
}

/// Subscription service implementing [`Subscriptions`].
#[derive(Clone)]
pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    users: Arc<dyn UserRepository>,
    links: Arc<dyn CareLinkRepository>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionService {
    /// Create the service.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        users: Arc<dyn UserRepository>,
        links: Arc<dyn CareLinkRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            users,
            links,
            clock,
        }
    }

    async fn current(&self, doctor_id: UserId) -> Result<Subscription, Error> {
        Ok(self
            .subscriptions
            .find(doctor_id)
            .await?
            .unwrap_or_else(|| Subscription::free(doctor_id, self.clock.utc())))
    }

    async fn view(&self, subscription: Subscription) -> Result<SubscriptionView, Error> {
        let effective_plan = subscription.effective_plan(self.clock.utc().date_naive());
        let patients_linked = self.links.count_patients(subscription.doctor_id).await?;
        Ok(SubscriptionView {
            subscription,
            effective_plan,
            patient_limit: effective_plan.patient_limit(),
            patients_linked,
        })
    }

    async fn store(&self, subscription: Subscription) -> Result<SubscriptionView, Error> {
        self.subscriptions.save(&subscription).await?;
        self.view(subscription).await
    }
}

#[async_trait]
impl Subscriptions for SubscriptionService {
    async fn get_mine(&self, principal: Principal) -> Result<SubscriptionView, Error> {
        principal.require_doctor()?;
        let subscription = self.current(principal.user_id).await?;
        self.view(subscription).await
    }

    async fn change_plan(&self, principal: Principal, plan: Plan) -> Result<SubscriptionView, Error> {
        principal.require_doctor()?;
        let current = self.current(principal.user_id).await?;
        let next = current
            .change_plan(plan, self.clock.utc())
            .map_err(map_change_error)?;
        info!(
            doctor_id = %principal.user_id,
            from = %current.plan,
            to = %next.plan,
            status = %next.status,
            "subscription plan changed"
        );
        self.store(next).await
    }

    async fn cancel(&self, principal: Principal) -> Result<SubscriptionView, Error> {
        principal.require_doctor()?;
        let current = self.current(principal.user_id).await?;
        let next = current.cancel(self.clock.utc()).map_err(map_change_error)?;
        info!(
            doctor_id = %principal.user_id,
            period_end = %next.current_period_end,
            "subscription cancelled"
        );
        self.store(next).await
    }

    async fn set_status(
        &self,
        principal: Principal,
        doctor_id: UserId,
        status: SubscriptionStatus,
    ) -> Result<SubscriptionView, Error> {
        principal.require_admin()?;
        let doctor = self
            .users
            .find_by_id(doctor_id)
            .await?
            .ok_or_else(|| Error::not_found("user not found"))?;
        if doctor.role != Role::Doctor {
            return Err(Error::invalid_request("only doctors hold subscriptions")
                .with_details(json!({ "field": "doctorId", "code": "not_a_doctor" })));
        }
        let next = self
            .current(doctor_id)
            .await?
            .with_status(status, self.clock.utc());
        info!(%doctor_id, %status, "subscription status overridden");
        self.store(next).await
    }

    async fn patient_limit(&self, doctor_id: UserId) -> Result<Option<u32>, Error> {
        let subscription = self.current(doctor_id).await?;
        Ok(subscription
            .effective_plan(self.clock.utc().date_naive())
            .patient_limit())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{
        MockCareLinkRepository, MockSubscriptionRepository, MockUserRepository,
    };
    use crate::domain::test_fixtures::{admin, at, doctor, fixture_clock, fixture_now, user};

    struct Mocks {
        subscriptions: MockSubscriptionRepository,
        users: MockUserRepository,
        links: MockCareLinkRepository,
    }

    impl Mocks {
        fn new() -> Self {
            let mut links = MockCareLinkRepository::new();
            links.expect_count_patients().returning(|_| Ok(3));
            Self {
                subscriptions: MockSubscriptionRepository::new(),
                users: MockUserRepository::new(),
                links,
            }
        }

        fn stored(mut self, subscription: Option<Subscription>) -> Self {
            self.subscriptions
                .expect_find()
                .return_once(move |_| Ok(subscription));
            self
        }

        fn build(self) -> SubscriptionService {
            SubscriptionService::new(
                Arc::new(self.subscriptions),
                Arc::new(self.users),
                Arc::new(self.links),
                fixture_clock(),
            )
        }
    }

    #[tokio::test]
    async fn doctors_without_a_record_are_on_free() {
        let view = Mocks::new()
            .stored(None)
            .build()
            .get_mine(doctor())
            .await
            .expect("view");
        assert_eq!(view.effective_plan, Plan::Free);
        assert_eq!(view.patient_limit, Some(5));
        assert_eq!(view.patients_linked, 3);
    }

    #[tokio::test]
    async fn first_upgrade_is_saved_as_a_trial() {
        let mut mocks = Mocks::new().stored(None);
        mocks
            .subscriptions
            .expect_save()
            .withf(|saved| saved.status == SubscriptionStatus::Trialing)
            .times(1)
            .return_once(|_| Ok(()));
        let view = mocks
            .build()
            .change_plan(doctor(), Plan::Professional)
            .await
            .expect("upgraded");
        assert_eq!(view.patient_limit, Some(100));
    }

    #[rstest]
    #[case::already_free(None, Plan::Free)]
    #[case::already_on_plan(Some(Plan::Professional), Plan::Professional)]
    #[tokio::test]
    async fn changing_to_the_current_plan_conflicts(
        #[case] current: Option<Plan>,
        #[case] plan: Plan,
    ) {
        let caller = doctor();
        let stored = current.map(|current| {
            Subscription::free(caller.user_id, at(2026, 3, 1))
                .change_plan(current, at(2026, 3, 1))
                .expect("trial")
        });
        let mut mocks = Mocks::new().stored(stored);
        mocks.subscriptions.expect_save().never();
        let err = mocks
            .build()
            .change_plan(caller, plan)
            .await
            .expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(err.details().expect("details")["code"], "same_plan");
    }

    #[tokio::test]
    async fn free_plans_cannot_be_cancelled() {
        let err = Mocks::new()
            .stored(None)
            .build()
            .cancel(doctor())
            .await
            .expect_err("free");
        assert_eq!(err.details().expect("details")["code"], "free_plan");
    }

    #[tokio::test]
    async fn lapsed_cancellations_limit_to_free() {
        let caller = doctor();
        let paid = Subscription::free(caller.user_id, at(2026, 1, 1))
            .change_plan(Plan::Clinic, at(2026, 1, 1))
            .expect("trial")
            .cancel(at(2026, 1, 2))
            .expect("cancel");
        assert!(paid.current_period_end < fixture_now().date_naive());
        let limit = Mocks::new()
            .stored(Some(paid))
            .build()
            .patient_limit(caller.user_id)
            .await
            .expect("limit");
        assert_eq!(limit, Some(5));
    }

    #[tokio::test]
    async fn clinic_plan_is_unlimited() {
        let caller = doctor();
        let clinic = Subscription::free(caller.user_id, at(2026, 3, 1))
            .change_plan(Plan::Clinic, at(2026, 3, 1))
            .expect("trial");
        let limit = Mocks::new()
            .stored(Some(clinic))
            .build()
            .patient_limit(caller.user_id)
            .await
            .expect("limit");
        assert_eq!(limit, None);
    }

    #[tokio::test]
    async fn status_overrides_target_doctors_only() {
        let target = user(Role::Patient, "pat@example.com");
        let target_id = target.id;
        let mut mocks = Mocks::new();
        mocks
            .users
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(target)));
        let err = mocks
            .build()
            .set_status(admin(), target_id, SubscriptionStatus::PastDue)
            .await
            .expect_err("patient");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn admins_override_status() {
        let target = user(Role::Doctor, "doc@example.com");
        let target_id = target.id;
        let mut mocks = Mocks::new().stored(None);
        mocks
            .users
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(target)));
        mocks.subscriptions.expect_save().return_once(|_| Ok(()));
        let view = mocks
            .build()
            .set_status(admin(), target_id, SubscriptionStatus::PastDue)
            .await
            .expect("overridden");
        assert_eq!(view.subscription.status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn doctors_cannot_override_status() {
        let err = Mocks::new()
            .build()
            .set_status(doctor(), UserId::random(), SubscriptionStatus::Active)
            .await
            .expect_err("not admin");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
