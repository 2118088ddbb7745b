//! Course enrollment: joining, switching and lesson selection
//!
//! A user holds at most one active enrollment. Switching deactivates every
//! other enrollment in the same transaction that activates the new one, and
//! the user's heart mirror follows the newly active course.

use chrono::Utc;
use serde::Serialize;
use sx_common::db::{Enrollment, Lesson};
use tracing::{debug, info};

use super::{require_active_enrollment, require_user, ProgressionService};
use crate::caller::CallerId;
use crate::db::UnitOfWork;
use crate::error::{Error, Result};

/// Enrollment after an enroll or activate call
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentChange {
    pub enrollment: Enrollment,
    /// A new enrollment row was created
    pub created: bool,
}

/// Course must exist and its first unit must have a lesson
async fn require_first_lesson(uow: &mut UnitOfWork, course_id: i64) -> Result<Lesson> {
    if uow.course(course_id).await?.is_none() {
        return Err(Error::NotFound(format!("course {}", course_id)));
    }
    uow.first_lesson(course_id)
        .await?
        .ok_or(Error::EmptyCourse(course_id))
}

impl ProgressionService {
    /// Make `course_id` the caller's active course
    ///
    /// Resumes an earlier enrollment with its hearts, points and position
    /// intact, or starts a fresh one at the course's first lesson.
    pub async fn activate_enrollment(
        &self,
        caller: &CallerId,
        course_id: i64,
    ) -> Result<EnrollmentChange> {
        let mut uow = self.store.begin().await?;
        let user_id = caller.as_str();

        require_user(&mut uow, caller).await?;
        let first_lesson = require_first_lesson(&mut uow, course_id).await?;
        let now = Utc::now();

        let deactivated = uow.deactivate_other_enrollments(user_id, course_id).await?;

        let (enrollment, created) = match uow.enrollment_for_course(user_id, course_id).await? {
            Some(existing) => (uow.reactivate_enrollment(existing.id, now).await?, false),
            None => (
                uow.insert_enrollment(user_id, course_id, &first_lesson, true, now)
                    .await?,
                true,
            ),
        };

        uow.sync_user_hearts(user_id, enrollment.course_hearts)
            .await?;

        uow.commit().await?;

        info!(
            user_id,
            course_id,
            enrollment_id = enrollment.id,
            created,
            deactivated,
            "Activated enrollment"
        );

        Ok(EnrollmentChange {
            enrollment,
            created,
        })
    }

    /// Enroll in `course_id` without leaving the current course
    ///
    /// An existing enrollment is returned untouched. A new one only becomes
    /// active when the caller has no active course yet.
    pub async fn enroll_course(
        &self,
        caller: &CallerId,
        course_id: i64,
    ) -> Result<EnrollmentChange> {
        let mut uow = self.store.begin().await?;
        let user_id = caller.as_str();

        require_user(&mut uow, caller).await?;
        let first_lesson = require_first_lesson(&mut uow, course_id).await?;

        if let Some(existing) = uow.enrollment_for_course(user_id, course_id).await? {
            return Ok(EnrollmentChange {
                enrollment: existing,
                created: false,
            });
        }

        let activate = uow.active_enrollment(user_id).await?.is_none();
        let enrollment = uow
            .insert_enrollment(user_id, course_id, &first_lesson, activate, Utc::now())
            .await?;
        if activate {
            uow.sync_user_hearts(user_id, enrollment.course_hearts)
                .await?;
        }

        uow.commit().await?;

        info!(
            user_id,
            course_id,
            enrollment_id = enrollment.id,
            active = activate,
            "Enrolled in course"
        );

        Ok(EnrollmentChange {
            enrollment,
            created: true,
        })
    }

    /// Point the active enrollment at `lesson_id`
    pub async fn set_current_lesson(
        &self,
        caller: &CallerId,
        lesson_id: i64,
    ) -> Result<Enrollment> {
        let mut uow = self.store.begin().await?;

        require_user(&mut uow, caller).await?;
        let enrollment = require_active_enrollment(&mut uow, caller).await?;

        let lesson = uow
            .lesson(lesson_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("lesson {}", lesson_id)))?;

        // Lessons of other courses are invisible from here
        if uow.lesson_course_id(lesson.id).await? != Some(enrollment.course_id) {
            return Err(Error::NotFound(format!(
                "lesson {} in course {}",
                lesson_id, enrollment.course_id
            )));
        }

        let enrollment = uow
            .set_current_lesson(enrollment.id, &lesson, Utc::now())
            .await?;

        uow.commit().await?;

        debug!(
            user_id = caller.as_str(),
            lesson_id,
            unit_id = lesson.unit_id,
            "Set current lesson"
        );

        Ok(enrollment)
    }
}
