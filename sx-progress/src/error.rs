//! Hard-failure error types for the progression service
//!
//! Expected business states (no hearts left, practice attempt, ...) are not
//! errors; they travel as [`crate::outcome::Refusal`]. Everything here is a
//! failure the caller must surface.

use thiserror::Error;

/// Result type for progression operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No valid caller identity
    #[error("Unauthorized")]
    Unauthorized,

    /// Referenced course, lesson or challenge does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller has no active enrollment to record progress against
    #[error("No active enrollment for user {0}")]
    NoActiveEnrollment(String),

    /// Course has no first unit with a lesson to start from
    #[error("Course {0} has no lessons")]
    EmptyCourse(i64),

    /// Second attempt row for the same (enrollment, challenge) pair
    ///
    /// The uniqueness constraint caught a concurrent first attempt.
    #[error("Duplicate attempt for enrollment {enrollment_id}, challenge {challenge_id}")]
    PracticeDuplicateRace { enrollment_id: i64, challenge_id: i64 },

    /// Course content document could not be parsed or is inconsistent
    #[error("Invalid course document: {0}")]
    CourseDocument(String),

    /// Database operation error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage or configuration bootstrap error
    #[error(transparent)]
    Common(#[from] sx_common::Error),
}
