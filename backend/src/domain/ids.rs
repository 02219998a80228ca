//! Strongly typed UUID identifiers for every aggregate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Borrow the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a registered account.
    UserId
);
define_id!(
    /// Identifier of a doctor-authored protocol.
    ProtocolId
);
define_id!(
    /// Identifier of a task inside a protocol plan.
    TaskId
);
define_id!(
    /// Identifier of a patient's run of a protocol.
    PrescriptionId
);
define_id!(
    /// Identifier of a doctor-defined check-in question.
    QuestionId
);
define_id!(
    /// Identifier of a submitted check-in.
    CheckInId
);
define_id!(
    /// Identifier of a patient habit.
    HabitId
);
define_id!(
    /// Identifier of a course.
    CourseId
);
define_id!(
    /// Identifier of a course module.
    ModuleId
);
define_id!(
    /// Identifier of a course lesson.
    LessonId
);
define_id!(
    /// Identifier of a referral.
    ReferralId
);
define_id!(
    /// Identifier of a clinic.
    ClinicId
);
