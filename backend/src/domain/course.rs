//! Courses: modules of lessons authored by doctors and assigned to patients.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, bounded_text, optional_text};
use super::{CourseId, LessonId, ModuleId, UserId};

/// Maximum course title length.
pub const TITLE_MAX: usize = 160;
/// Maximum lesson body length.
pub const BODY_MAX: usize = 20_000;
/// Longest lesson, in minutes.
pub const LESSON_MINUTES_MAX: u16 = 600;

/// A single lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Identifier stable across outline edits.
    pub id: LessonId,
    /// Lesson heading.
    pub title: String,
    /// Lesson content.
    pub body: String,
    /// Estimated reading or viewing time.
    pub duration_minutes: u16,
}

/// An ordered group of lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    /// Identifier stable across outline edits.
    pub id: ModuleId,
    /// Module heading.
    pub title: String,
    /// Lessons in order.
    pub lessons: Vec<Lesson>,
}

/// Validated course outline.
///
/// ## Invariants
/// - Module and lesson identifiers are unique.
/// - Titles and bodies are trimmed and non-empty.
/// - Lesson durations are within `1..=600` minutes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourseOutline {
    modules: Vec<CourseModule>,
}

impl CourseOutline {
    /// Validate an outline.
    ///
    /// # Errors
    /// Returns a validation error on the `modules` field.
    pub fn new(modules: Vec<CourseModule>) -> Result<Self, ValidationError> {
        let mut module_ids = HashSet::new();
        let mut lesson_ids = HashSet::new();
        let mut normalised = Vec::with_capacity(modules.len());
        for module in modules {
            if !module_ids.insert(module.id) {
                return Err(duplicate("module", &module.id.to_string()));
            }
            let mut lessons = Vec::with_capacity(module.lessons.len());
            for lesson in module.lessons {
                if !lesson_ids.insert(lesson.id) {
                    return Err(duplicate("lesson", &lesson.id.to_string()));
                }
                if lesson.duration_minutes == 0 || lesson.duration_minutes > LESSON_MINUTES_MAX {
                    return Err(ValidationError::new(
                        "modules",
                        "invalid_duration",
                        format!("lesson durations must be between 1 and {LESSON_MINUTES_MAX} minutes"),
                    ));
                }
                lessons.push(Lesson {
                    id: lesson.id,
                    title: bounded_text("modules", &lesson.title, TITLE_MAX)?,
                    body: bounded_text("modules", &lesson.body, BODY_MAX)?,
                    duration_minutes: lesson.duration_minutes,
                });
            }
            normalised.push(CourseModule {
                id: module.id,
                title: bounded_text("modules", &module.title, TITLE_MAX)?,
                lessons,
            });
        }
        Ok(Self {
            modules: normalised,
        })
    }

    /// Modules in order.
    #[must_use]
    pub fn modules(&self) -> &[CourseModule] {
        &self.modules
    }

    /// Consume the outline.
    #[must_use]
    pub fn into_modules(self) -> Vec<CourseModule> {
        self.modules
    }

    /// All lessons across modules.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|module| module.lessons.iter())
    }

    /// Whether the outline contains `lesson_id`.
    #[must_use]
    pub fn contains_lesson(&self, lesson_id: LessonId) -> bool {
        self.lessons().any(|lesson| lesson.id == lesson_id)
    }
}

fn duplicate(kind: &str, id: &str) -> ValidationError {
    ValidationError::new(
        "modules",
        "duplicate_id",
        format!("{kind} {id} appears more than once"),
    )
}

/// A stored course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    /// Identifier.
    pub id: CourseId,
    /// Authoring doctor.
    pub doctor_id: UserId,
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Published courses may receive enrolments.
    pub published: bool,
    /// Modules and lessons.
    pub outline: CourseOutline,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last edit instant.
    pub updated_at: DateTime<Utc>,
}

/// Editable course content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseContent {
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Modules and lessons.
    pub outline: CourseOutline,
}

impl CourseContent {
    /// Validate raw author input.
    ///
    /// # Errors
    /// Returns a validation error for the first invalid field.
    pub fn new(
        title: &str,
        description: Option<&str>,
        modules: Vec<CourseModule>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            title: bounded_text("title", title, TITLE_MAX)?,
            description: optional_text("description", description, BODY_MAX)?,
            outline: CourseOutline::new(modules)?,
        })
    }
}

/// A patient's enrolment in a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    /// Course.
    pub course_id: CourseId,
    /// Enrolled patient.
    pub patient_id: UserId,
    /// Doctor who assigned the course.
    pub enrolled_by: UserId,
    /// Lessons the patient has completed.
    pub completed_lessons: Vec<LessonId>,
    /// Set when every lesson is completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Enrolment instant.
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    /// Mark `lesson_id` completed or not, keeping `completed_at` in step.
    ///
    /// Lessons that no longer exist in `outline` are dropped from the record.
    pub fn set_lesson(
        &mut self,
        outline: &CourseOutline,
        lesson_id: LessonId,
        completed: bool,
        now: DateTime<Utc>,
    ) {
        self.completed_lessons
            .retain(|id| *id != lesson_id && outline.contains_lesson(*id));
        if completed {
            self.completed_lessons.push(lesson_id);
        }
        let progress = CourseProgress::compute(outline, &self.completed_lessons);
        self.completed_at = match (progress.is_complete(), self.completed_at) {
            (true, Some(at)) => Some(at),
            (true, None) => Some(now),
            (false, _) => None,
        };
    }
}

/// Lesson completion summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseProgress {
    /// Completed lessons still present in the outline.
    pub completed_lessons: usize,
    /// Lessons in the outline.
    pub total_lessons: usize,
    /// `completed * 100 / total`, floored.
    pub percent: u8,
}

impl CourseProgress {
    /// Summarise completions against the outline.
    #[must_use]
    pub fn compute(outline: &CourseOutline, completed: &[LessonId]) -> Self {
        let done: HashSet<LessonId> = completed
            .iter()
            .copied()
            .filter(|id| outline.contains_lesson(*id))
            .collect();
        let total_lessons = outline.lessons().count();
        let completed_lessons = done.len();
        let percent = if total_lessons == 0 {
            0
        } else {
            u8::try_from(completed_lessons.saturating_mul(100) / total_lessons).unwrap_or(100)
        };
        Self {
            completed_lessons,
            total_lessons,
            percent,
        }
    }

    /// Whether every lesson is completed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.total_lessons > 0 && self.completed_lessons >= self.total_lessons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn lesson(title: &str) -> Lesson {
        Lesson {
            id: LessonId::random(),
            title: title.to_owned(),
            body: "Read this carefully.".to_owned(),
            duration_minutes: 10,
        }
    }

    #[fixture]
    fn outline() -> CourseOutline {
        CourseOutline::new(vec![
            CourseModule {
                id: ModuleId::random(),
                title: "Basics".to_owned(),
                lessons: vec![lesson("Sleep"), lesson("Light")],
            },
            CourseModule {
                id: ModuleId::random(),
                title: "Routines".to_owned(),
                lessons: vec![lesson("Evenings")],
            },
        ])
        .expect("valid outline")
    }

    fn lesson_ids(outline: &CourseOutline) -> Vec<LessonId> {
        outline.lessons().map(|lesson| lesson.id).collect()
    }

    #[rstest]
    fn rejects_duplicate_lessons() {
        let shared = lesson("Shared");
        let modules = vec![CourseModule {
            id: ModuleId::random(),
            title: "Dup".to_owned(),
            lessons: vec![shared.clone(), shared],
        }];
        let err = CourseOutline::new(modules).expect_err("duplicate lesson");
        assert_eq!(err.code(), "duplicate_id");
    }

    #[rstest]
    fn rejects_zero_minute_lessons() {
        let mut short = lesson("Blink");
        short.duration_minutes = 0;
        let modules = vec![CourseModule {
            id: ModuleId::random(),
            title: "Tiny".to_owned(),
            lessons: vec![short],
        }];
        let err = CourseOutline::new(modules).expect_err("zero minutes");
        assert_eq!(err.code(), "invalid_duration");
    }

    #[rstest]
    fn progress_floors_percentage(outline: CourseOutline) {
        let ids = lesson_ids(&outline);
        let progress = CourseProgress::compute(&outline, ids.get(..1).unwrap_or_default());
        assert_eq!(progress.completed_lessons, 1);
        assert_eq!(progress.total_lessons, 3);
        assert_eq!(progress.percent, 33);
        assert!(!progress.is_complete());
    }

    #[rstest]
    fn enrollment_tracks_completion(outline: CourseOutline) {
        let now = Utc::now();
        let mut enrollment = Enrollment {
            course_id: CourseId::random(),
            patient_id: UserId::random(),
            enrolled_by: UserId::random(),
            completed_lessons: Vec::new(),
            completed_at: None,
            enrolled_at: now,
        };
        for id in lesson_ids(&outline) {
            enrollment.set_lesson(&outline, id, true, now);
        }
        assert_eq!(enrollment.completed_at, Some(now));

        let first = *lesson_ids(&outline).first().expect("lesson");
        enrollment.set_lesson(&outline, first, false, now);
        assert_eq!(enrollment.completed_at, None);
        assert_eq!(enrollment.completed_lessons.len(), 2);
    }

    #[rstest]
    fn repeated_completion_is_idempotent(outline: CourseOutline) {
        let now = Utc::now();
        let first = *lesson_ids(&outline).first().expect("lesson");
        let mut enrollment = Enrollment {
            course_id: CourseId::random(),
            patient_id: UserId::random(),
            enrolled_by: UserId::random(),
            completed_lessons: Vec::new(),
            completed_at: None,
            enrolled_at: now,
        };
        enrollment.set_lesson(&outline, first, true, now);
        enrollment.set_lesson(&outline, first, true, now);
        assert_eq!(enrollment.completed_lessons, vec![first]);
    }
}
