//! Prescribing, status transitions, completions and progress reads.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use super::care_team_service::ensure_linked;
use super::validation::{ValidationError, optional_text};
use crate::domain::ports::{
    CareLinkRepository, CompletionUpdate, PrescribeRequest, PrescriptionQuery,
    PrescriptionRepository, Prescriptions, ProtocolRepository, TodayPlan, TodaySession, TodayTask,
};
use crate::domain::{
    Error, Page, PageRequest, Prescription, PrescriptionFilter, PrescriptionId,
    PrescriptionProgress, PrescriptionStatus, Principal, Protocol, Role, TaskCompletion,
    TransitionActor, TransitionError,
};

/// Maximum length of a doctor's notes.
pub const NOTES_MAX: usize = 2000;

fn map_transition_error(error: TransitionError) -> Error {
    match error {
        TransitionError::NotAllowed { from, to } => {
            info!(%from, %to, "prescription transition rejected");
            Error::conflict(error.to_string())
                .with_details(json!({ "from": from.as_str(), "to": to.as_str() }))
        }
        TransitionError::PatientOnly { .. } => Error::forbidden(error.to_string()),
    }
}

/// Prescription service implementing [`Prescriptions`].
#[derive(Clone)]
pub struct PrescriptionService {
    protocols: Arc<dyn ProtocolRepository>,
    prescriptions: Arc<dyn PrescriptionRepository>,
    links: Arc<dyn CareLinkRepository>,
    clock: Arc<dyn Clock>,
}

impl PrescriptionService {
    /// Create the service.
    pub fn new(
        protocols: Arc<dyn ProtocolRepository>,
        prescriptions: Arc<dyn PrescriptionRepository>,
        links: Arc<dyn CareLinkRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            protocols,
            prescriptions,
            links,
            clock,
        }
    }

    async fn find(&self, id: PrescriptionId) -> Result<Prescription, Error> {
        self.prescriptions
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found("prescription not found"))
    }

    async fn visible(
        &self,
        principal: Principal,
        id: PrescriptionId,
    ) -> Result<Prescription, Error> {
        let prescription = self.find(id).await?;
        if principal.is_admin()
            || prescription.doctor_id == principal.user_id
            || prescription.patient_id == principal.user_id
        {
            Ok(prescription)
        } else {
            Err(Error::forbidden("no access to this prescription"))
        }
    }

    async fn protocol_of(&self, prescription: &Prescription) -> Result<Protocol, Error> {
        self.protocols
            .find(prescription.protocol_id)
            .await?
            .ok_or_else(|| {
                Error::internal(format!(
                    "prescription {} references missing protocol {}",
                    prescription.id, prescription.protocol_id
                ))
            })
    }

    async fn compute_progress(
        &self,
        prescription: &Prescription,
    ) -> Result<PrescriptionProgress, Error> {
        let protocol = self.protocol_of(prescription).await?;
        let completions = self.prescriptions.completions(prescription.id).await?;
        Ok(PrescriptionProgress::compute(
            &protocol.content.plan,
            protocol.content.duration_days,
            prescription,
            &completions,
            self.clock.utc().date_naive(),
        ))
    }

    fn filter_for(principal: Principal, query: PrescriptionQuery) -> Result<PrescriptionFilter, Error> {
        match principal.role {
            Role::Doctor => Ok(PrescriptionFilter {
                doctor_id: Some(principal.user_id),
                patient_id: query.patient_id,
                status: query.status,
            }),
            Role::Patient => match query.patient_id {
                Some(other) if other != principal.user_id => {
                    Err(Error::forbidden("patients may only list their own prescriptions"))
                }
                _ => Ok(PrescriptionFilter {
                    doctor_id: None,
                    patient_id: Some(principal.user_id),
                    status: query.status,
                }),
            },
            Role::SuperAdmin => Ok(PrescriptionFilter {
                doctor_id: None,
                patient_id: query.patient_id,
                status: query.status,
            }),
        }
    }
}

#[async_trait]
impl Prescriptions for PrescriptionService {
    async fn prescribe(
        &self,
        principal: Principal,
        request: PrescribeRequest,
    ) -> Result<Prescription, Error> {
        principal.require_doctor()?;
        let protocol = self
            .protocols
            .find(request.protocol_id)
            .await?
            .ok_or_else(|| Error::not_found("protocol not found"))?;
        if protocol.doctor_id != principal.user_id {
            return Err(Error::forbidden("only the author may prescribe this protocol"));
        }
        ensure_linked(self.links.as_ref(), principal.user_id, request.patient_id).await?;
        let notes = optional_text("notes", request.notes.as_deref(), NOTES_MAX)?;

        let prescription = Prescription::prescribe(
            PrescriptionId::random(),
            protocol.id,
            principal.user_id,
            request.patient_id,
            notes,
            self.clock.utc(),
        );
        self.prescriptions.insert(&prescription).await?;
        info!(
            prescription_id = %prescription.id,
            protocol_id = %prescription.protocol_id,
            patient_id = %prescription.patient_id,
            "protocol prescribed"
        );
        Ok(prescription)
    }

    async fn get(&self, principal: Principal, id: PrescriptionId) -> Result<Prescription, Error> {
        self.visible(principal, id).await
    }

    async fn list(
        &self,
        principal: Principal,
        query: PrescriptionQuery,
        page: PageRequest,
    ) -> Result<Page<Prescription>, Error> {
        let filter = Self::filter_for(principal, query)?;
        Ok(self.prescriptions.list(&filter, page).await?)
    }

    async fn transition(
        &self,
        principal: Principal,
        id: PrescriptionId,
        to: PrescriptionStatus,
    ) -> Result<Prescription, Error> {
        let current = self.find(id).await?;
        let actor = if current.patient_id == principal.user_id {
            TransitionActor::Patient
        } else if current.doctor_id == principal.user_id {
            TransitionActor::Doctor
        } else {
            return Err(Error::forbidden(
                "only the patient or the prescribing doctor may change this prescription",
            ));
        };

        let next = current
            .transition(to, actor, self.clock.utc())
            .map_err(map_transition_error)?;
        if current.status == PrescriptionStatus::Prescribed
            && to == PrescriptionStatus::Active
            && self
                .prescriptions
                .has_running(current.patient_id, current.protocol_id)
                .await?
        {
            return Err(
                Error::conflict("patient is already running this protocol")
                    .with_details(json!({ "code": "already_running" })),
            );
        }
        self.prescriptions.update(&next).await?;
        info!(
            prescription_id = %id,
            from = %current.status,
            to = %next.status,
            "prescription status changed"
        );
        Ok(next)
    }

    async fn progress(
        &self,
        principal: Principal,
        id: PrescriptionId,
    ) -> Result<PrescriptionProgress, Error> {
        let prescription = self.visible(principal, id).await?;
        self.compute_progress(&prescription).await
    }

    async fn today(&self, principal: Principal, id: PrescriptionId) -> Result<TodayPlan, Error> {
        let prescription = self.visible(principal, id).await?;
        let protocol = self.protocol_of(&prescription).await?;
        let today = self.clock.utc().date_naive();
        let day_number = prescription
            .schedule_position(protocol.content.duration_days, today)
            .map_or(0, |position| position.current_day);

        let Some(day) = protocol.content.plan.day(day_number) else {
            return Ok(TodayPlan {
                prescription_id: id,
                day_number,
                title: None,
                sessions: Vec::new(),
            });
        };
        let done: HashSet<_> = self
            .prescriptions
            .completions(id)
            .await?
            .into_iter()
            .filter(|completion| completion.day_number == day_number)
            .map(|completion| completion.task_id)
            .collect();
        let sessions = day
            .sessions
            .iter()
            .map(|session| TodaySession {
                title: session.title.clone(),
                time_of_day: session.time_of_day,
                tasks: session
                    .tasks
                    .iter()
                    .map(|task| TodayTask {
                        completed: done.contains(&task.id),
                        task: task.clone(),
                    })
                    .collect(),
            })
            .collect();
        Ok(TodayPlan {
            prescription_id: id,
            day_number,
            title: day.title.clone(),
            sessions,
        })
    }

    async fn completions(
        &self,
        principal: Principal,
        id: PrescriptionId,
    ) -> Result<Vec<TaskCompletion>, Error> {
        self.visible(principal, id).await?;
        Ok(self.prescriptions.completions(id).await?)
    }

    async fn record_completion(
        &self,
        principal: Principal,
        id: PrescriptionId,
        update: CompletionUpdate,
    ) -> Result<PrescriptionProgress, Error> {
        let prescription = self.find(id).await?;
        if prescription.patient_id != principal.user_id {
            return Err(Error::forbidden("only the patient may record completions"));
        }
        if prescription.status != PrescriptionStatus::Active {
            return Err(Error::conflict("prescription is not active")
                .with_details(json!({ "status": prescription.status.as_str() })));
        }
        let protocol = self.protocol_of(&prescription).await?;
        let now = self.clock.utc();
        let current_day = prescription
            .schedule_position(protocol.content.duration_days, now.date_naive())
            .map_or(0, |position| position.current_day);
        if update.day_number == 0 || update.day_number > current_day {
            return Err(ValidationError::new(
                "dayNumber",
                "out_of_range",
                format!("dayNumber must be between 1 and {current_day}"),
            )
            .into());
        }
        if !protocol
            .content
            .plan
            .is_scheduled(update.day_number, update.task_id)
        {
            return Err(ValidationError::new(
                "taskId",
                "not_scheduled",
                format!(
                    "task {} is not scheduled on day {}",
                    update.task_id, update.day_number
                ),
            )
            .into());
        }

        if update.completed {
            let completion = TaskCompletion {
                prescription_id: id,
                day_number: update.day_number,
                task_id: update.task_id,
                completed_at: now,
            };
            self.prescriptions.upsert_completion(&completion).await?;
        } else {
            self.prescriptions
                .delete_completion(id, update.day_number, update.task_id)
                .await?;
        }
        self.compute_progress(&prescription).await
    }
}

#[cfg(test)]
#[path = "prescription_service_tests.rs"]
mod tests;
