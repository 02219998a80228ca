//! Check-in questions authored by doctors and daily answers from patients.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use mockable::Clock;
use tracing::info;

use super::care_team_service::{ensure_linked, ensure_patient_access, subject_patient};
use super::validation::ValidationError;
use crate::domain::ports::{
    CareLinkRepository, CheckInRepository, CheckIns, HistoryQuery, NewQuestion,
};
use crate::domain::{
    Answer, CheckIn, CheckInId, CheckInQuestion, Error, Principal, QuestionId, UserId,
    validate_answers,
};

/// Check-in service implementing [`CheckIns`].
#[derive(Clone)]
pub struct CheckInService {
    check_ins: Arc<dyn CheckInRepository>,
    links: Arc<dyn CareLinkRepository>,
    clock: Arc<dyn Clock>,
}

impl CheckInService {
    /// Create the service.
    pub fn new(
        check_ins: Arc<dyn CheckInRepository>,
        links: Arc<dyn CareLinkRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            check_ins,
            links,
            clock,
        }
    }

    async fn applicable_questions(&self, patient_id: UserId) -> Result<Vec<CheckInQuestion>, Error> {
        let doctor_ids: Vec<UserId> = self
            .links
            .list_doctors(patient_id)
            .await?
            .into_iter()
            .map(|linked| linked.user.id)
            .collect();
        if doctor_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .check_ins
            .active_questions_for(&doctor_ids, patient_id)
            .await?)
    }
}

#[async_trait]
impl CheckIns for CheckInService {
    async fn create_question(
        &self,
        principal: Principal,
        question: NewQuestion,
    ) -> Result<CheckInQuestion, Error> {
        principal.require_doctor()?;
        if let Some(patient_id) = question.patient_id {
            ensure_linked(self.links.as_ref(), principal.user_id, patient_id).await?;
        }
        let created = CheckInQuestion::new(
            principal.user_id,
            question.patient_id,
            &question.prompt,
            question.kind,
            self.clock.utc(),
        )?;
        self.check_ins.insert_question(&created).await?;
        info!(
            question_id = %created.id,
            doctor_id = %created.doctor_id,
            "check-in question created"
        );
        Ok(created)
    }

    async fn deactivate_question(&self, principal: Principal, id: QuestionId) -> Result<(), Error> {
        principal.require_doctor()?;
        let mut question = self
            .check_ins
            .find_question(id)
            .await?
            .ok_or_else(|| Error::not_found("question not found"))?;
        if question.doctor_id != principal.user_id {
            return Err(Error::forbidden("only the author may deactivate this question"));
        }
        if question.active {
            question.active = false;
            self.check_ins.save_question(&question).await?;
            info!(question_id = %id, "check-in question deactivated");
        }
        Ok(())
    }

    async fn list_questions(
        &self,
        principal: Principal,
        patient_id: Option<UserId>,
    ) -> Result<Vec<CheckInQuestion>, Error> {
        principal.require_doctor()?;
        if let Some(patient_id) = patient_id {
            ensure_linked(self.links.as_ref(), principal.user_id, patient_id).await?;
        }
        Ok(self
            .check_ins
            .questions_by_doctor(principal.user_id, patient_id)
            .await?)
    }

    async fn questions_for_me(&self, principal: Principal) -> Result<Vec<CheckInQuestion>, Error> {
        principal.require_patient()?;
        self.applicable_questions(principal.user_id).await
    }

    async fn submit(
        &self,
        principal: Principal,
        date: Option<NaiveDate>,
        answers: Vec<Answer>,
    ) -> Result<CheckIn, Error> {
        principal.require_patient()?;
        let now = self.clock.utc();
        let today = now.date_naive();
        let date = date.unwrap_or(today);
        if date > today {
            return Err(
                ValidationError::new("date", "future_date", "check-ins cannot be dated in the future")
                    .into(),
            );
        }
        let questions = self.applicable_questions(principal.user_id).await?;
        let answers = validate_answers(answers, &questions)?;

        let check_in = CheckIn {
            id: CheckInId::random(),
            patient_id: principal.user_id,
            date,
            answers,
            submitted_at: now,
        };
        let stored = self.check_ins.upsert_check_in(&check_in).await?;
        info!(
            check_in_id = %stored.id,
            patient_id = %stored.patient_id,
            %date,
            "check-in submitted"
        );
        Ok(stored)
    }

    async fn history(
        &self,
        principal: Principal,
        query: HistoryQuery,
    ) -> Result<Vec<CheckIn>, Error> {
        let patient_id = subject_patient(principal, query.patient_id)?;
        ensure_patient_access(self.links.as_ref(), principal, patient_id).await?;
        if matches!((query.from, query.to), (Some(from), Some(to)) if from > to) {
            return Err(
                ValidationError::new("from", "invalid_range", "from must not be after to").into(),
            );
        }
        Ok(self
            .check_ins
            .check_ins(patient_id, query.from, query.to)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::{MockCareLinkRepository, MockCheckInRepository};
    use crate::domain::test_fixtures::{at, doctor, fixture_clock, fixture_now, patient, user};
    use crate::domain::{AnswerValue, ErrorCode, LinkedUser, QuestionKind, Role};

    fn service(check_ins: MockCheckInRepository, links: MockCareLinkRepository) -> CheckInService {
        CheckInService::new(Arc::new(check_ins), Arc::new(links), fixture_clock())
    }

    fn linked_doctor() -> LinkedUser {
        LinkedUser {
            user: user(Role::Doctor, "doc@example.com"),
            linked_at: at(2026, 2, 1),
        }
    }

    fn yes_no(doctor_id: UserId) -> CheckInQuestion {
        CheckInQuestion::new(doctor_id, None, "Slept well?", QuestionKind::YesNo, at(2026, 2, 1))
            .expect("question")
    }

    #[tokio::test]
    async fn targeted_questions_require_a_care_link() {
        let mut links = MockCareLinkRepository::new();
        links.expect_exists().return_once(|_, _| Ok(false));
        let mut check_ins = MockCheckInRepository::new();
        check_ins.expect_insert_question().never();

        let err = service(check_ins, links)
            .create_question(
                doctor(),
                NewQuestion {
                    patient_id: Some(UserId::random()),
                    prompt: "Pain level".to_owned(),
                    kind: QuestionKind::Scale { min: 0, max: 10 },
                },
            )
            .await
            .expect_err("unlinked patient");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn global_questions_are_stored() {
        let mut check_ins = MockCheckInRepository::new();
        check_ins
            .expect_insert_question()
            .times(1)
            .return_once(|_| Ok(()));
        let question = service(check_ins, MockCareLinkRepository::new())
            .create_question(
                doctor(),
                NewQuestion {
                    patient_id: None,
                    prompt: "  Mood today?  ".to_owned(),
                    kind: QuestionKind::Text { max_length: 200 },
                },
            )
            .await
            .expect("created");
        assert_eq!(question.prompt, "Mood today?");
        assert!(question.active);
    }

    #[tokio::test]
    async fn deactivation_is_idempotent() {
        let caller = doctor();
        let mut question = yes_no(caller.user_id);
        question.active = false;
        let mut check_ins = MockCheckInRepository::new();
        check_ins
            .expect_find_question()
            .return_once(move |_| Ok(Some(question)));
        check_ins.expect_save_question().never();
        service(check_ins, MockCareLinkRepository::new())
            .deactivate_question(caller, QuestionId::random())
            .await
            .expect("already inactive");
    }

    #[tokio::test]
    async fn only_authors_deactivate() {
        let question = yes_no(UserId::random());
        let mut check_ins = MockCheckInRepository::new();
        check_ins
            .expect_find_question()
            .return_once(move |_| Ok(Some(question)));
        let err = service(check_ins, MockCareLinkRepository::new())
            .deactivate_question(doctor(), QuestionId::random())
            .await
            .expect_err("not the author");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn patients_without_doctors_have_no_questions() {
        let mut links = MockCareLinkRepository::new();
        links.expect_list_doctors().return_once(|_| Ok(Vec::new()));
        let mut check_ins = MockCheckInRepository::new();
        check_ins.expect_active_questions_for().never();
        let questions = service(check_ins, links)
            .questions_for_me(patient())
            .await
            .expect("questions");
        assert!(questions.is_empty());
    }

    #[tokio::test]
    async fn submit_defaults_to_today_and_validates_answers() {
        let doc = linked_doctor();
        let question = yes_no(doc.user.id);
        let question_id = question.id;
        let mut links = MockCareLinkRepository::new();
        links.expect_list_doctors().return_once(move |_| Ok(vec![doc]));
        let mut check_ins = MockCheckInRepository::new();
        check_ins
            .expect_active_questions_for()
            .return_once(move |_, _| Ok(vec![question]));
        check_ins
            .expect_upsert_check_in()
            .withf(|check_in| check_in.date == fixture_now().date_naive())
            .times(1)
            .returning(|check_in| Ok(check_in.clone()));

        let stored = service(check_ins, links)
            .submit(
                patient(),
                None,
                vec![Answer {
                    question_id,
                    value: AnswerValue::Bool(true),
                }],
            )
            .await
            .expect("submitted");
        assert_eq!(stored.answers.len(), 1);
    }

    #[tokio::test]
    async fn submit_rejects_mismatched_answers() {
        let doc = linked_doctor();
        let question = yes_no(doc.user.id);
        let question_id = question.id;
        let mut links = MockCareLinkRepository::new();
        links.expect_list_doctors().return_once(move |_| Ok(vec![doc]));
        let mut check_ins = MockCheckInRepository::new();
        check_ins
            .expect_active_questions_for()
            .return_once(move |_, _| Ok(vec![question]));
        check_ins.expect_upsert_check_in().never();

        let err = service(check_ins, links)
            .submit(
                patient(),
                None,
                vec![Answer {
                    question_id,
                    value: AnswerValue::Number(4),
                }],
            )
            .await
            .expect_err("wrong kind");
        assert_eq!(err.details().expect("details")["code"], "invalid_answer");
    }

    #[tokio::test]
    async fn submit_rejects_future_dates() {
        let tomorrow = fixture_now().date_naive().succ_opt().expect("tomorrow");
        let err = service(MockCheckInRepository::new(), MockCareLinkRepository::new())
            .submit(patient(), Some(tomorrow), Vec::new())
            .await
            .expect_err("future");
        assert_eq!(err.details().expect("details")["code"], "future_date");
    }

    #[rstest]
    #[case::doctor_without_patient(Role::Doctor, None, ErrorCode::InvalidRequest)]
    #[case::other_patient(Role::Patient, Some(UserId::random()), ErrorCode::Forbidden)]
    #[tokio::test]
    async fn history_checks_access(
        #[case] role: Role,
        #[case] patient_id: Option<UserId>,
        #[case] expected: ErrorCode,
    ) {
        let caller = Principal::new(UserId::random(), role);
        let err = service(MockCheckInRepository::new(), MockCareLinkRepository::new())
            .history(
                caller,
                HistoryQuery {
                    patient_id,
                    ..HistoryQuery::default()
                },
            )
            .await
            .expect_err("rejected");
        assert_eq!(err.code(), expected);
    }

    #[tokio::test]
    async fn history_rejects_inverted_ranges() {
        let caller = patient();
        let err = service(MockCheckInRepository::new(), MockCareLinkRepository::new())
            .history(
                caller,
                HistoryQuery {
                    patient_id: None,
                    from: Some(at(2026, 3, 5).date_naive()),
                    to: Some(at(2026, 3, 1).date_naive()),
                },
            )
            .await
            .expect_err("inverted");
        assert_eq!(err.details().expect("details")["field"], "from");
    }

    #[tokio::test]
    async fn linked_doctors_read_history() {
        let caller = doctor();
        let subject = UserId::random();
        let mut links = MockCareLinkRepository::new();
        links.expect_exists().return_once(|_, _| Ok(true));
        let mut check_ins = MockCheckInRepository::new();
        check_ins
            .expect_check_ins()
            .withf(move |patient_id, _, _| *patient_id == subject)
            .return_once(|_, _, _| Ok(Vec::new()));
        let history = service(check_ins, links)
            .history(
                caller,
                HistoryQuery {
                    patient_id: Some(subject),
                    ..HistoryQuery::default()
                },
            )
            .await
            .expect("history");
        assert!(history.is_empty());
    }
}
