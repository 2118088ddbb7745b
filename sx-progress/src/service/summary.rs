//! Read-side views: a learner's progress and the points leaderboard

use chrono::Utc;
use serde::Serialize;
use sx_common::db::{Course, Enrollment, Lesson, User};
use sx_common::is_subscription_active;

use super::economy::{progress_percent, DEFAULT_LEADERBOARD_SIZE, MAX_LEADERBOARD_SIZE};
use super::{require_user, ProgressionService};
use crate::caller::CallerId;
use crate::error::Result;

/// Everything the learn page header and sidebar show
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub user: User,
    pub subscription_active: bool,
    pub active_enrollment: Option<Enrollment>,
    pub active_course: Option<Course>,
    pub completed_challenges: i64,
    pub total_challenges: i64,
    pub progress_percent: i64,
    pub current_lesson: Option<Lesson>,
    /// First lesson, in course order, that still has an uncompleted challenge
    pub next_lesson: Option<Lesson>,
    /// All enrollments, most recently used first
    pub enrollments: Vec<Enrollment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: String,
    pub name: Option<String>,
    pub total_points: i64,
}

impl ProgressionService {
    pub async fn progress_summary(&self, caller: &CallerId) -> Result<ProgressSummary> {
        // One snapshot keeps the counts consistent with the rows
        let mut uow = self.store.begin_read().await?;
        let user_id = caller.as_str();

        let user = require_user(&mut uow, caller).await?;
        let subscription = uow.subscription(user_id).await?;
        let enrollments = uow.enrollments(user_id).await?;
        let active = enrollments.iter().find(|e| e.is_active).cloned();

        let mut summary = ProgressSummary {
            user,
            subscription_active: is_subscription_active(subscription.as_ref(), Utc::now()),
            active_enrollment: None,
            active_course: None,
            completed_challenges: 0,
            total_challenges: 0,
            progress_percent: 0,
            current_lesson: None,
            next_lesson: None,
            enrollments,
        };

        if let Some(enrollment) = active {
            let (completed, total) = uow.challenge_counts(&enrollment).await?;
            summary.completed_challenges = completed;
            summary.total_challenges = total;
            summary.progress_percent = progress_percent(completed, total);
            summary.active_course = uow.course(enrollment.course_id).await?;
            summary.current_lesson = match enrollment.current_lesson_id {
                Some(lesson_id) => uow.lesson(lesson_id).await?,
                None => None,
            };
            summary.next_lesson = uow.first_incomplete_lesson(&enrollment).await?;
            summary.active_enrollment = Some(enrollment);
        }

        uow.commit().await?;

        Ok(summary)
    }

    /// Top users by lifetime points; `limit` defaults to 10 and is capped at 100
    pub async fn leaderboard(&self, limit: Option<i64>) -> Result<Vec<LeaderboardEntry>> {
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
            .clamp(1, MAX_LEADERBOARD_SIZE);

        let users = self.store.leaderboard(limit).await?;

        Ok(users
            .into_iter()
            .enumerate()
            .map(|(index, user)| LeaderboardEntry {
                rank: index as i64 + 1,
                user_id: user.id,
                name: user.name,
                total_points: user.total_points,
            })
            .collect())
    }
}
