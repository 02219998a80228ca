//! In-memory implementation of every driven port.
//!
//! Mirrors the database constraints the Diesel adapters rely on: unique
//! e-mails, one link per pair, one running prescription per protocol and
//! patient, one check-in per day and one membership per clinic and doctor.
//! Violations surface as [`RepositoryError::Conflict`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::ports::{
    CareLinkRepository, CheckInRepository, ClinicRepository, CourseRepository, HabitRepository,
    PrescriptionRepository, ProtocolRepository, ProtocolUsage, ReferralRepository,
    RepositoryError, StoredCredentials, SubscriptionRepository, UserRepository,
};
use crate::domain::{
    CareLink, CheckIn, CheckInQuestion, Clinic, ClinicId, ClinicMember, ClinicMembership,
    ClinicRole, Course, CourseId, EmailAddress, Enrollment, Habit, HabitId, LinkedUser, Page,
    PageKey, PageRequest, PasswordHash, Prescription, PrescriptionFilter, PrescriptionId,
    Protocol, ProtocolId, QuestionId, Referral, ReferralFilter, ReferralId, Role, Subscription,
    TaskCompletion, TaskId, User, UserId,
};

#[derive(Default)]
struct State {
    users: HashMap<UserId, (User, PasswordHash)>,
    links: HashMap<(UserId, UserId), CareLink>,
    protocols: HashMap<ProtocolId, Protocol>,
    prescriptions: HashMap<PrescriptionId, Prescription>,
    completions: BTreeMap<(PrescriptionId, u16, TaskId), TaskCompletion>,
    questions: HashMap<QuestionId, CheckInQuestion>,
    check_ins: HashMap<(UserId, NaiveDate), CheckIn>,
    habits: HashMap<HabitId, Habit>,
    habit_logs: HashMap<HabitId, BTreeSet<NaiveDate>>,
    courses: HashMap<CourseId, Course>,
    enrollments: HashMap<(CourseId, UserId), Enrollment>,
    referrals: HashMap<ReferralId, Referral>,
    subscriptions: HashMap<UserId, Subscription>,
    clinics: HashMap<ClinicId, Clinic>,
    memberships: HashMap<(ClinicId, UserId), ClinicMembership>,
}

/// Shared in-memory store for integration tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::connection("memory store poisoned"))
    }
}

/// Newest-first page over `(created_at, id)` keys.
fn paginate<T: Clone>(
    items: impl Iterator<Item = T>,
    page: &PageRequest,
    key: impl Fn(&T) -> PageKey,
) -> Page<T> {
    let mut rows: Vec<T> = items
        .filter(|item| {
            let item_key = key(item);
            page.after
                .is_none_or(|after| after.precedes(item_key.created_at, item_key.id))
        })
        .collect();
    rows.sort_by_key(|item| {
        let item_key = key(item);
        std::cmp::Reverse((item_key.created_at, item_key.id))
    });
    rows.truncate(page.fetch_limit());
    Page::from_overfetch(rows, page, key)
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User, password_hash: &PasswordHash) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if state.users.values().any(|(existing, _)| existing.email == user.email) {
            return Err(RepositoryError::conflict("duplicate value violates users_email_key"));
        }
        state
            .users
            .insert(user.id, (user.clone(), password_hash.clone()));
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|(user, _)| &user.email == email)
            .map(|(user, _)| user.clone()))
    }

    async fn find_credentials(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<StoredCredentials>, RepositoryError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|(user, _)| &user.email == email)
            .map(|(user, hash)| StoredCredentials {
                user: user.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn list(&self, role: Option<Role>, page: PageRequest) -> Result<Page<User>, RepositoryError> {
        let state = self.lock()?;
        let users = state
            .users
            .values()
            .map(|(user, _)| user)
            .filter(|user| role.is_none_or(|wanted| user.role == wanted))
            .cloned();
        Ok(paginate(users, &page, |user| {
            PageKey::new(user.created_at, *user.id.as_uuid())
        }))
    }
}

fn linked(state: &State, user_id: UserId, link: &CareLink) -> Result<LinkedUser, RepositoryError> {
    let (user, _) = state
        .users
        .get(&user_id)
        .ok_or_else(|| RepositoryError::query("care link references a missing user"))?;
    Ok(LinkedUser {
        user: user.clone(),
        linked_at: link.created_at,
    })
}

#[async_trait]
impl CareLinkRepository for MemoryStore {
    async fn insert(&self, link: &CareLink) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let key = (link.doctor_id, link.patient_id);
        if state.links.contains_key(&key) {
            return Err(RepositoryError::conflict("duplicate value violates care_links_pkey"));
        }
        state.links.insert(key, link.clone());
        Ok(())
    }

    async fn delete(&self, doctor_id: UserId, patient_id: UserId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.links.remove(&(doctor_id, patient_id)).is_some())
    }

    async fn exists(&self, doctor_id: UserId, patient_id: UserId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.links.contains_key(&(doctor_id, patient_id)))
    }

    async fn count_patients(&self, doctor_id: UserId) -> Result<u64, RepositoryError> {
        let state = self.lock()?;
        Ok(count(
            state
                .links
                .keys()
                .filter(|(doctor, _)| *doctor == doctor_id)
                .count(),
        ))
    }

    async fn list_patients(
        &self,
        doctor_id: UserId,
        page: PageRequest,
    ) -> Result<Page<LinkedUser>, RepositoryError> {
        let state = self.lock()?;
        let patients = state
            .links
            .values()
            .filter(|link| link.doctor_id == doctor_id)
            .map(|link| linked(&state, link.patient_id, link))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(paginate(patients.into_iter(), &page, |patient| {
            PageKey::new(patient.linked_at, *patient.user.id.as_uuid())
        }))
    }

    async fn list_doctors(&self, patient_id: UserId) -> Result<Vec<LinkedUser>, RepositoryError> {
        let state = self.lock()?;
        let mut doctors = state
            .links
            .values()
            .filter(|link| link.patient_id == patient_id)
            .map(|link| linked(&state, link.doctor_id, link))
            .collect::<Result<Vec<_>, _>>()?;
        doctors.sort_by_key(|doctor| (doctor.linked_at, doctor.user.id));
        Ok(doctors)
    }
}

#[async_trait]
impl ProtocolRepository for MemoryStore {
    async fn save(&self, protocol: &Protocol) -> Result<(), RepositoryError> {
        self.lock()?.protocols.insert(protocol.id, protocol.clone());
        Ok(())
    }

    async fn find(&self, id: ProtocolId) -> Result<Option<Protocol>, RepositoryError> {
        Ok(self.lock()?.protocols.get(&id).cloned())
    }

    async fn delete(&self, id: ProtocolId) -> Result<bool, RepositoryError> {
        let mut state = self.lock()?;
        if state.prescriptions.values().any(|p| p.protocol_id == id) {
            return Err(RepositoryError::conflict("record is still referenced"));
        }
        Ok(state.protocols.remove(&id).is_some())
    }

    async fn list_for_doctor(
        &self,
        doctor_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Protocol>, RepositoryError> {
        let state = self.lock()?;
        let protocols = state
            .protocols
            .values()
            .filter(|protocol| protocol.doctor_id == doctor_id)
            .cloned();
        Ok(paginate(protocols, &page, |protocol| {
            PageKey::new(protocol.created_at, *protocol.id.as_uuid())
        }))
    }
}

fn clashes_with_running(state: &State, prescription: &Prescription) -> bool {
    prescription.status.is_running()
        && state.prescriptions.values().any(|other| {
            other.id != prescription.id
                && other.patient_id == prescription.patient_id
                && other.protocol_id == prescription.protocol_id
                && other.status.is_running()
        })
}

#[async_trait]
impl PrescriptionRepository for MemoryStore {
    async fn insert(&self, prescription: &Prescription) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if clashes_with_running(&state, prescription) {
            return Err(RepositoryError::conflict(
                "duplicate value violates prescriptions_running_key",
            ));
        }
        state
            .prescriptions
            .insert(prescription.id, prescription.clone());
        Ok(())
    }

    async fn update(&self, prescription: &Prescription) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if !state.prescriptions.contains_key(&prescription.id) {
            return Err(RepositoryError::query("prescription vanished during update"));
        }
        if clashes_with_running(&state, prescription) {
            return Err(RepositoryError::conflict(
                "duplicate value violates prescriptions_running_key",
            ));
        }
        state
            .prescriptions
            .insert(prescription.id, prescription.clone());
        Ok(())
    }

    async fn find(&self, id: PrescriptionId) -> Result<Option<Prescription>, RepositoryError> {
        Ok(self.lock()?.prescriptions.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &PrescriptionFilter,
        page: PageRequest,
    ) -> Result<Page<Prescription>, RepositoryError> {
        let state = self.lock()?;
        let rows = state
            .prescriptions
            .values()
            .filter(|p| filter.doctor_id.is_none_or(|id| p.doctor_id == id))
            .filter(|p| filter.patient_id.is_none_or(|id| p.patient_id == id))
            .filter(|p| filter.status.is_none_or(|status| p.status == status))
            .cloned();
        Ok(paginate(rows, &page, |p| {
            PageKey::new(p.prescribed_at, *p.id.as_uuid())
        }))
    }

    async fn has_running(&self, patient_id: UserId, protocol_id: ProtocolId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.prescriptions.values().any(|p| {
            p.patient_id == patient_id && p.protocol_id == protocol_id && p.status.is_running()
        }))
    }

    async fn patient_holds(&self, patient_id: UserId, protocol_id: ProtocolId) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()?
            .prescriptions
            .values()
            .any(|p| p.patient_id == patient_id && p.protocol_id == protocol_id))
    }

    async fn protocol_usage(&self, protocol_id: ProtocolId) -> Result<ProtocolUsage, RepositoryError> {
        let state = self.lock()?;
        let of_protocol = || {
            state
                .prescriptions
                .values()
                .filter(move |p| p.protocol_id == protocol_id)
        };
        Ok(ProtocolUsage {
            total: count(of_protocol().count()),
            running: count(of_protocol().filter(|p| p.status.is_running()).count()),
        })
    }

    async fn upsert_completion(&self, completion: &TaskCompletion) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if !state.prescriptions.contains_key(&completion.prescription_id) {
            return Err(RepositoryError::conflict("record is still referenced"));
        }
        state
            .completions
            .entry((
                completion.prescription_id,
                completion.day_number,
                completion.task_id,
            ))
            .or_insert_with(|| completion.clone());
        Ok(())
    }

    async fn delete_completion(
        &self,
        prescription_id: PrescriptionId,
        day_number: u16,
        task_id: TaskId,
    ) -> Result<(), RepositoryError> {
        self.lock()?
            .completions
            .remove(&(prescription_id, day_number, task_id));
        Ok(())
    }

    async fn completions(&self, prescription_id: PrescriptionId) -> Result<Vec<TaskCompletion>, RepositoryError> {
        let state = self.lock()?;
        let mut rows: Vec<TaskCompletion> = state
            .completions
            .values()
            .filter(|completion| completion.prescription_id == prescription_id)
            .cloned()
            .collect();
        rows.sort_by_key(|completion| (completion.day_number, completion.completed_at));
        Ok(rows)
    }
}

#[async_trait]
impl CheckInRepository for MemoryStore {
    async fn insert_question(&self, question: &CheckInQuestion) -> Result<(), RepositoryError> {
        self.lock()?.questions.insert(question.id, question.clone());
        Ok(())
    }

    async fn find_question(&self, id: QuestionId) -> Result<Option<CheckInQuestion>, RepositoryError> {
        Ok(self.lock()?.questions.get(&id).cloned())
    }

    async fn save_question(&self, question: &CheckInQuestion) -> Result<(), RepositoryError> {
        self.lock()?.questions.insert(question.id, question.clone());
        Ok(())
    }

    async fn questions_by_doctor(
        &self,
        doctor_id: UserId,
        patient_id: Option<UserId>,
    ) -> Result<Vec<CheckInQuestion>, RepositoryError> {
        let state = self.lock()?;
        let mut rows: Vec<CheckInQuestion> = state
            .questions
            .values()
            .filter(|q| q.doctor_id == doctor_id)
            .filter(|q| patient_id.is_none_or(|patient| q.patient_id.is_none_or(|id| id == patient)))
            .cloned()
            .collect();
        rows.sort_by_key(|q| (q.created_at, q.id));
        Ok(rows)
    }

    async fn active_questions_for(
        &self,
        doctor_ids: &[UserId],
        patient_id: UserId,
    ) -> Result<Vec<CheckInQuestion>, RepositoryError> {
        let state = self.lock()?;
        let mut rows: Vec<CheckInQuestion> = state
            .questions
            .values()
            .filter(|q| q.active && doctor_ids.contains(&q.doctor_id))
            .filter(|q| q.patient_id.is_none_or(|id| id == patient_id))
            .cloned()
            .collect();
        rows.sort_by_key(|q| (q.created_at, q.id));
        Ok(rows)
    }

    async fn upsert_check_in(&self, check_in: &CheckIn) -> Result<CheckIn, RepositoryError> {
        let mut state = self.lock()?;
        let stored = state
            .check_ins
            .entry((check_in.patient_id, check_in.date))
            .and_modify(|existing| {
                existing.answers.clone_from(&check_in.answers);
                existing.submitted_at = check_in.submitted_at;
            })
            .or_insert_with(|| check_in.clone());
        Ok(stored.clone())
    }

    async fn check_ins(
        &self,
        patient_id: UserId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<CheckIn>, RepositoryError> {
        let state = self.lock()?;
        let mut rows: Vec<CheckIn> = state
            .check_ins
            .values()
            .filter(|c| c.patient_id == patient_id)
            .filter(|c| from.is_none_or(|from| c.date >= from))
            .filter(|c| to.is_none_or(|to| c.date <= to))
            .cloned()
            .collect();
        rows.sort_by_key(|c| std::cmp::Reverse(c.date));
        Ok(rows)
    }
}

#[async_trait]
impl HabitRepository for MemoryStore {
    async fn save(&self, habit: &Habit) -> Result<(), RepositoryError> {
        self.lock()?.habits.insert(habit.id, habit.clone());
        Ok(())
    }

    async fn find(&self, id: HabitId) -> Result<Option<Habit>, RepositoryError> {
        Ok(self.lock()?.habits.get(&id).cloned())
    }

    async fn list(&self, patient_id: UserId, include_archived: bool) -> Result<Vec<Habit>, RepositoryError> {
        let state = self.lock()?;
        let mut rows: Vec<Habit> = state
            .habits
            .values()
            .filter(|h| h.patient_id == patient_id && (include_archived || !h.archived))
            .cloned()
            .collect();
        rows.sort_by_key(|h| (h.created_at, h.id));
        Ok(rows)
    }

    async fn set_log(&self, habit_id: HabitId, date: NaiveDate, done: bool) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let logs = state.habit_logs.entry(habit_id).or_default();
        if done {
            logs.insert(date);
        } else {
            logs.remove(&date);
        }
        Ok(())
    }

    async fn logs(&self, habit_id: HabitId) -> Result<Vec<NaiveDate>, RepositoryError> {
        Ok(self
            .lock()?
            .habit_logs
            .get(&habit_id)
            .map(|logs| logs.iter().copied().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl CourseRepository for MemoryStore {
    async fn save(&self, course: &Course) -> Result<(), RepositoryError> {
        self.lock()?.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn find(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self.lock()?.courses.get(&id).cloned())
    }

    async fn delete(&self, id: CourseId) -> Result<bool, RepositoryError> {
        let mut state = self.lock()?;
        if state.enrollments.keys().any(|(course, _)| *course == id) {
            return Err(RepositoryError::conflict("record is still referenced"));
        }
        Ok(state.courses.remove(&id).is_some())
    }

    async fn list_for_doctor(&self, doctor_id: UserId, page: PageRequest) -> Result<Page<Course>, RepositoryError> {
        let state = self.lock()?;
        let courses = state
            .courses
            .values()
            .filter(|course| course.doctor_id == doctor_id)
            .cloned();
        Ok(paginate(courses, &page, |course| {
            PageKey::new(course.created_at, *course.id.as_uuid())
        }))
    }

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let key = (enrollment.course_id, enrollment.patient_id);
        if state.enrollments.contains_key(&key) {
            return Err(RepositoryError::conflict(
                "duplicate value violates course_enrollments_pkey",
            ));
        }
        state.enrollments.insert(key, enrollment.clone());
        Ok(())
    }

    async fn find_enrollment(&self, course_id: CourseId, patient_id: UserId) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(self.lock()?.enrollments.get(&(course_id, patient_id)).cloned())
    }

    async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if let Some(stored) = state
            .enrollments
            .get_mut(&(enrollment.course_id, enrollment.patient_id))
        {
            stored.completed_lessons.clone_from(&enrollment.completed_lessons);
            stored.completed_at = enrollment.completed_at;
        }
        Ok(())
    }

    async fn count_enrollments(&self, course_id: CourseId) -> Result<u64, RepositoryError> {
        let state = self.lock()?;
        Ok(count(
            state
                .enrollments
                .keys()
                .filter(|(course, _)| *course == course_id)
                .count(),
        ))
    }

    async fn enrollments_for_patient(&self, patient_id: UserId) -> Result<Vec<(Course, Enrollment)>, RepositoryError> {
        let state = self.lock()?;
        let mut rows = state
            .enrollments
            .values()
            .filter(|enrollment| enrollment.patient_id == patient_id)
            .map(|enrollment| {
                state
                    .courses
                    .get(&enrollment.course_id)
                    .map(|course| (course.clone(), enrollment.clone()))
                    .ok_or_else(|| RepositoryError::query("enrolment references a missing course"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.sort_by_key(|(_, enrollment)| std::cmp::Reverse(enrollment.enrolled_at));
        Ok(rows)
    }
}

#[async_trait]
impl ReferralRepository for MemoryStore {
    async fn insert(&self, referral: &Referral) -> Result<(), RepositoryError> {
        self.lock()?.referrals.insert(referral.id, referral.clone());
        Ok(())
    }

    async fn save(&self, referral: &Referral) -> Result<(), RepositoryError> {
        self.lock()?.referrals.insert(referral.id, referral.clone());
        Ok(())
    }

    async fn find(&self, id: ReferralId) -> Result<Option<Referral>, RepositoryError> {
        Ok(self.lock()?.referrals.get(&id).cloned())
    }

    async fn has_open(&self, referrer_id: UserId, email: &EmailAddress) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.referrals.values().any(|r| {
            r.referrer_id == referrer_id && &r.draft.referee_email == email && r.status.is_open()
        }))
    }

    async fn open_by_email(&self, email: &EmailAddress) -> Result<Vec<Referral>, RepositoryError> {
        let state = self.lock()?;
        let mut rows: Vec<Referral> = state
            .referrals
            .values()
            .filter(|r| &r.draft.referee_email == email && r.status.is_open())
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn list(&self, filter: ReferralFilter, page: PageRequest) -> Result<Page<Referral>, RepositoryError> {
        let state = self.lock()?;
        let rows = state
            .referrals
            .values()
            .filter(|r| filter.referrer_id.is_none_or(|id| r.referrer_id == id))
            .filter(|r| filter.status.is_none_or(|status| r.status == status))
            .cloned();
        Ok(paginate(rows, &page, |r| {
            PageKey::new(r.created_at, *r.id.as_uuid())
        }))
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn find(&self, doctor_id: UserId) -> Result<Option<Subscription>, RepositoryError> {
        Ok(self.lock()?.subscriptions.get(&doctor_id).cloned())
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), RepositoryError> {
        self.lock()?
            .subscriptions
            .insert(subscription.doctor_id, subscription.clone());
        Ok(())
    }
}

#[async_trait]
impl ClinicRepository for MemoryStore {
    async fn create(&self, clinic: &Clinic, owner: &ClinicMembership) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state.clinics.insert(clinic.id, clinic.clone());
        state
            .memberships
            .insert((owner.clinic_id, owner.doctor_id), owner.clone());
        Ok(())
    }

    async fn find(&self, id: ClinicId) -> Result<Option<Clinic>, RepositoryError> {
        Ok(self.lock()?.clinics.get(&id).cloned())
    }

    async fn membership(&self, clinic_id: ClinicId, doctor_id: UserId) -> Result<Option<ClinicMembership>, RepositoryError> {
        Ok(self.lock()?.memberships.get(&(clinic_id, doctor_id)).cloned())
    }

    async fn members(&self, clinic_id: ClinicId) -> Result<Vec<ClinicMember>, RepositoryError> {
        let state = self.lock()?;
        let mut rows = state
            .memberships
            .values()
            .filter(|m| m.clinic_id == clinic_id)
            .map(|m| {
                state
                    .users
                    .get(&m.doctor_id)
                    .map(|(user, _)| ClinicMember {
                        membership: m.clone(),
                        user: user.clone(),
                    })
                    .ok_or_else(|| RepositoryError::query("membership references a missing user"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.sort_by_key(|member| (member.membership.joined_at, member.membership.doctor_id));
        Ok(rows)
    }

    async fn add_member(&self, membership: &ClinicMembership) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let key = (membership.clinic_id, membership.doctor_id);
        if state.memberships.contains_key(&key) {
            return Err(RepositoryError::conflict(
                "duplicate value violates clinic_memberships_pkey",
            ));
        }
        state.memberships.insert(key, membership.clone());
        Ok(())
    }

    async fn update_role(&self, clinic_id: ClinicId, doctor_id: UserId, role: ClinicRole) -> Result<(), RepositoryError> {
        if let Some(membership) = self.lock()?.memberships.get_mut(&(clinic_id, doctor_id)) {
            membership.role = role;
        }
        Ok(())
    }

    async fn remove_member(&self, clinic_id: ClinicId, doctor_id: UserId) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()?
            .memberships
            .remove(&(clinic_id, doctor_id))
            .is_some())
    }

    async fn count_owners(&self, clinic_id: ClinicId) -> Result<u64, RepositoryError> {
        let state = self.lock()?;
        Ok(count(
            state
                .memberships
                .values()
                .filter(|m| m.clinic_id == clinic_id && m.role == ClinicRole::Owner)
                .count(),
        ))
    }

    async fn clinics_for(&self, doctor_id: UserId) -> Result<Vec<(Clinic, ClinicRole)>, RepositoryError> {
        let state = self.lock()?;
        let mut rows = state
            .memberships
            .values()
            .filter(|m| m.doctor_id == doctor_id)
            .filter_map(|m| state.clinics.get(&m.clinic_id).map(|c| (c.clone(), m.role)))
            .collect::<Vec<_>>();
        rows.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }
}
