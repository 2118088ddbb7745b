//! Challenge outcomes: correct answers credit points, wrong answers cost hearts
//!
//! First attempts at a challenge are heart-gated. Repeat attempts are
//! practice: never gated, never penalized, and the only way a correct answer
//! gives a heart back. An active subscription bypasses the gate.

use chrono::Utc;
use serde::Serialize;
use sx_common::is_subscription_active;
use tracing::{debug, warn};

use super::economy::{progress_percent, CHALLENGE_REWARD};
use super::{require_active_enrollment, require_user, ProgressionService};
use crate::caller::CallerId;
use crate::error::{Error, Result};
use crate::outcome::{Outcome, Refusal};

/// Balances after a correct answer was recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeRecorded {
    /// Lesson owning the challenge, for view invalidation by the caller
    pub lesson_id: i64,
    pub practice: bool,
    pub attempts: i64,
    pub course_hearts: i64,
    pub course_points: i64,
    pub progress_percent: i64,
    pub hearts: i64,
    pub total_points: i64,
}

/// Balances after a wrong answer cost a heart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartConsumed {
    pub lesson_id: i64,
    pub course_hearts: i64,
    pub hearts: i64,
}

impl ProgressionService {
    /// Record a correct answer on `challenge_id` for the caller's active course
    pub async fn record_challenge_outcome(
        &self,
        caller: &CallerId,
        challenge_id: i64,
    ) -> Result<Outcome<ChallengeRecorded>> {
        let mut uow = self.store.begin().await?;
        let user_id = caller.as_str();

        require_user(&mut uow, caller).await?;
        let enrollment = require_active_enrollment(&mut uow, caller).await?;
        let subscription = uow.subscription(user_id).await?;
        let challenge = uow
            .challenge(challenge_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("challenge {}", challenge_id)))?;
        let existing = uow.attempt(enrollment.id, challenge.id).await?;
        let practice = existing.is_some();
        let now = Utc::now();

        if enrollment.course_hearts == 0
            && !practice
            && !is_subscription_active(subscription.as_ref(), now)
        {
            warn!(
                user_id,
                challenge_id,
                enrollment_id = enrollment.id,
                "Challenge refused: no hearts left"
            );
            return Ok(Outcome::refused(Refusal::InsufficientHearts));
        }

        let (attempt, hearts_delta) = match existing {
            Some(attempt) => (uow.complete_practice_attempt(attempt.id, now).await?, 1),
            None => (
                uow.insert_attempt(user_id, enrollment.id, challenge.id, now)
                    .await?,
                0,
            ),
        };

        let enrollment = uow
            .adjust_enrollment(enrollment.id, hearts_delta, CHALLENGE_REWARD, now)
            .await?;
        let user = uow
            .adjust_user(user_id, hearts_delta, CHALLENGE_REWARD, now)
            .await?;

        let (completed, total) = uow.challenge_counts(&enrollment).await?;
        let percent = progress_percent(completed, total);
        uow.set_progress_percent(enrollment.id, percent).await?;

        uow.commit().await?;

        debug!(
            user_id,
            challenge_id,
            enrollment_id = enrollment.id,
            practice,
            attempts = attempt.attempts,
            course_hearts = enrollment.course_hearts,
            course_points = enrollment.course_points,
            progress_percent = percent,
            "Recorded challenge outcome"
        );

        Ok(Outcome::Applied(ChallengeRecorded {
            lesson_id: challenge.lesson_id,
            practice,
            attempts: attempt.attempts,
            course_hearts: enrollment.course_hearts,
            course_points: enrollment.course_points,
            progress_percent: percent,
            hearts: user.hearts,
            total_points: user.total_points,
        }))
    }

    /// Charge one heart for a wrong answer on `challenge_id`
    pub async fn consume_heart(
        &self,
        caller: &CallerId,
        challenge_id: i64,
    ) -> Result<Outcome<HeartConsumed>> {
        let mut uow = self.store.begin().await?;
        let user_id = caller.as_str();

        require_user(&mut uow, caller).await?;
        let enrollment = require_active_enrollment(&mut uow, caller).await?;
        let challenge = uow
            .challenge(challenge_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("challenge {}", challenge_id)))?;

        if uow.attempt(enrollment.id, challenge.id).await?.is_some() {
            return Ok(Outcome::refused(Refusal::PracticeNoPenalty));
        }

        let now = Utc::now();
        let subscription = uow.subscription(user_id).await?;
        if is_subscription_active(subscription.as_ref(), now) {
            return Ok(Outcome::refused(Refusal::UnlimitedHearts));
        }

        if enrollment.course_hearts == 0 {
            warn!(user_id, challenge_id, "No hearts left to consume");
            return Ok(Outcome::refused(Refusal::InsufficientHearts));
        }

        let enrollment = uow.adjust_enrollment(enrollment.id, -1, 0, now).await?;
        let user = uow.adjust_user(user_id, -1, 0, now).await?;

        uow.commit().await?;

        debug!(
            user_id,
            challenge_id,
            course_hearts = enrollment.course_hearts,
            "Consumed heart"
        );

        Ok(Outcome::Applied(HeartConsumed {
            lesson_id: challenge.lesson_id,
            course_hearts: enrollment.course_hearts,
            hearts: user.hearts,
        }))
    }
}
