//! Buying hearts back with points

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::economy::{MAX_HEARTS, REFILL_COST};
use super::{require_active_enrollment, require_user, ProgressionService};
use crate::caller::CallerId;
use crate::error::Result;
use crate::outcome::{Outcome, Refusal};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartsRefilled {
    pub course_hearts: i64,
    pub hearts: i64,
    pub total_points: i64,
}

impl ProgressionService {
    /// Fill the active course's hearts for a fixed price in lifetime points
    ///
    /// Full hearts are checked before the balance, so a full user with no
    /// points hears about the hearts.
    pub async fn refill_hearts(&self, caller: &CallerId) -> Result<Outcome<HeartsRefilled>> {
        let mut uow = self.store.begin().await?;
        let user_id = caller.as_str();

        let user = require_user(&mut uow, caller).await?;
        let enrollment = require_active_enrollment(&mut uow, caller).await?;

        if enrollment.course_hearts == MAX_HEARTS {
            return Ok(Outcome::refused(Refusal::HeartsAlreadyFull));
        }
        if user.total_points < REFILL_COST {
            return Ok(Outcome::refused(Refusal::InsufficientPoints));
        }

        let now = Utc::now();
        let enrollment = uow.refill_enrollment(enrollment.id, now).await?;
        let user = uow.refill_user(user_id, REFILL_COST, now).await?;

        uow.commit().await?;

        info!(
            user_id,
            enrollment_id = enrollment.id,
            total_points = user.total_points,
            "Refilled hearts"
        );

        Ok(Outcome::Applied(HeartsRefilled {
            course_hearts: enrollment.course_hearts,
            hearts: user.hearts,
            total_points: user.total_points,
        }))
    }
}
