//! Database models
//!
//! One struct per table, decoded with `sqlx::FromRow`. Identifiers follow the
//! content tree: courses, units, lessons and challenges use integer keys,
//! users use opaque string ids from the authentication provider, attempts use
//! UUIDs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subscription::SubscriptionTier;

/// Upper bound for both per-course and mirrored user hearts
pub const MAX_HEARTS: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub hearts: i64,
    pub total_points: i64,
    pub created_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub language: Option<String>,
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Unit {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub unit_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lesson {
    pub id: i64,
    pub unit_id: i64,
    pub title: String,
    pub lesson_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Challenge {
    pub id: i64,
    pub lesson_id: i64,
    pub kind: String,
    pub question: String,
    pub challenge_order: i64,
}

/// Lifecycle of an enrollment; only `Active` is produced by the progression core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum EnrollmentStatus {
    Active,
    Paused,
    Completed,
    Dropped,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub user_id: String,
    pub course_id: i64,
    pub is_active: bool,
    pub status: EnrollmentStatus,
    pub course_hearts: i64,
    pub course_points: i64,
    pub progress_percent: i64,
    pub current_unit_id: Option<i64>,
    pub current_lesson_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChallengeAttempt {
    pub id: Uuid,
    pub user_id: String,
    pub enrollment_id: i64,
    pub challenge_id: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: i64,
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub user_id: String,
    pub tier: SubscriptionTier,
    pub current_period_end: Option<DateTime<Utc>>,
    pub customer_id: Option<String>,
    pub provider_subscription_id: Option<String>,
    pub price_id: Option<String>,
}
