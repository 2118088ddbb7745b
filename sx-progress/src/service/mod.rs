//! Progression service
//!
//! Enrollment activation, challenge-attempt recording, the hearts economy and
//! points accrual. Every operation takes the caller's identity explicitly and
//! runs its reads and writes inside one [`UnitOfWork`]; nothing is written
//! when an operation is refused.

pub mod account;
pub mod challenges;
pub mod economy;
pub mod enrollment;
pub mod hearts;
pub mod summary;

use sx_common::db::{Enrollment, User};

use crate::caller::CallerId;
use crate::db::{ProgressStore, UnitOfWork};
use crate::error::{Error, Result};

pub use account::{SubscriptionStatus, SubscriptionUpdate};
pub use challenges::{ChallengeRecorded, HeartConsumed};
pub use enrollment::EnrollmentChange;
pub use hearts::HeartsRefilled;
pub use summary::{LeaderboardEntry, ProgressSummary};

/// Entry point for all progression operations
#[derive(Clone)]
pub struct ProgressionService {
    store: ProgressStore,
}

impl ProgressionService {
    pub fn new(store: ProgressStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }
}

/// Resolve the caller to a user row; unknown ids are not authorized
async fn require_user(uow: &mut UnitOfWork, caller: &CallerId) -> Result<User> {
    uow.user(caller.as_str()).await?.ok_or(Error::Unauthorized)
}

async fn require_active_enrollment(uow: &mut UnitOfWork, caller: &CallerId) -> Result<Enrollment> {
    uow.active_enrollment(caller.as_str())
        .await?
        .ok_or_else(|| Error::NoActiveEnrollment(caller.to_string()))
}
