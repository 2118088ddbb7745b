//! Shared fixture for progression integration tests

#![allow(dead_code)]

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use sx_common::db::{Enrollment, Subscription, User};
use sx_common::SubscriptionTier;
use sx_progress::db::{import_course, CourseDocument, ProgressStore};
use sx_progress::{CallerId, ProgressionService};
use tempfile::TempDir;

/// Two units; the first has two lessons, one with three challenges
pub const SPANISH: &str = r#"
title = "Spanish"
language = "es"

[[units]]
title = "Basics"

[[units.lessons]]
title = "Greetings"

[[units.lessons.challenges]]
kind = "SELECT"
question = "Which one of these is hello?"

[[units.lessons.challenges]]
kind = "ASSIST"
question = "hola"

[[units.lessons.challenges]]
kind = "FILL_BLANK"
question = "___ dias"

[[units.lessons]]
title = "Farewells"

[[units.lessons.challenges]]
kind = "SELECT"
question = "Which one of these is goodbye?"

[[units]]
title = "Food"

[[units.lessons]]
title = "Fruit"

[[units.lessons.challenges]]
kind = "MATCH"
question = "Match the fruit"
"#;

pub const FRENCH: &str = r#"
title = "French"
language = "fr"

[[units]]
title = "Basics"

[[units.lessons]]
title = "Greetings"

[[units.lessons.challenges]]
kind = "SELECT"
question = "Which one of these is bonjour?"
"#;

/// A course whose only unit has no lessons
pub const EMPTY: &str = r#"
title = "Klingon"

[[units]]
title = "Coming soon"
"#;

pub struct Fixture {
    pub pool: SqlitePool,
    pub service: ProgressionService,
    pub spanish: i64,
    pub french: i64,
    pub empty: i64,
    /// Keeps an on-disk database alive for the test's duration
    _dir: Option<TempDir>,
}

impl Fixture {
    /// Single-connection in-memory database
    pub async fn new() -> Self {
        let pool = sx_common::db::init_memory_database().await.unwrap();
        Self::seed(pool, None).await
    }

    /// File-backed database with a full connection pool, for concurrent callers
    pub async fn on_disk() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = sx_common::db::init_database(&dir.path().join("syntaxia.db"))
            .await
            .unwrap();
        Self::seed(pool, Some(dir)).await
    }

    async fn seed(pool: SqlitePool, dir: Option<TempDir>) -> Self {
        let spanish = import(&pool, SPANISH).await;
        let french = import(&pool, FRENCH).await;
        let empty = import(&pool, EMPTY).await;

        let service = ProgressionService::new(ProgressStore::new(pool.clone()));

        Self {
            pool,
            service,
            spanish,
            french,
            empty,
            _dir: dir,
        }
    }

    pub async fn user(&self, id: &str) -> CallerId {
        self.service
            .store()
            .create_user(id, Some(id))
            .await
            .unwrap();
        CallerId::new(id).unwrap()
    }

    /// New user already active in the Spanish course
    pub async fn learner(&self, id: &str) -> CallerId {
        let caller = self.user(id).await;
        self.service
            .activate_enrollment(&caller, self.spanish)
            .await
            .unwrap();
        caller
    }

    /// Challenge ids of a course in course order
    pub async fn challenges(&self, course_id: i64) -> Vec<i64> {
        sqlx::query_scalar(
            r#"
            SELECT c.id FROM challenges c
            JOIN lessons l ON l.id = c.lesson_id
            JOIN units u ON u.id = l.unit_id
            WHERE u.course_id = ?
            ORDER BY u.unit_order, l.lesson_order, c.challenge_order
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .unwrap()
    }

    /// Lesson ids of a course in course order
    pub async fn lessons(&self, course_id: i64) -> Vec<i64> {
        sqlx::query_scalar(
            r#"
            SELECT l.id FROM lessons l
            JOIN units u ON u.id = l.unit_id
            WHERE u.course_id = ?
            ORDER BY u.unit_order, l.lesson_order
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .unwrap()
    }

    pub async fn enrollment(&self, caller: &CallerId, course_id: i64) -> Enrollment {
        sqlx::query_as("SELECT * FROM enrollments WHERE user_id = ? AND course_id = ?")
            .bind(caller.as_str())
            .bind(course_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn user_row(&self, caller: &CallerId) -> User {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(caller.as_str())
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn attempt_rows(&self, caller: &CallerId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM challenge_attempts WHERE user_id = ?")
            .bind(caller.as_str())
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Force balances directly, bypassing the economy
    pub async fn set_balances(&self, caller: &CallerId, course_hearts: i64, total_points: i64) {
        sqlx::query("UPDATE enrollments SET course_hearts = ? WHERE user_id = ? AND is_active = 1")
            .bind(course_hearts)
            .bind(caller.as_str())
            .execute(&self.pool)
            .await
            .unwrap();
        sqlx::query("UPDATE users SET hearts = ?, total_points = ? WHERE id = ?")
            .bind(course_hearts)
            .bind(total_points)
            .bind(caller.as_str())
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn subscribe(&self, caller: &CallerId, tier: SubscriptionTier, days_left: Option<i64>) {
        let mut uow = self.service.store().begin().await.unwrap();
        uow.upsert_subscription(&Subscription {
            user_id: caller.as_str().to_string(),
            tier,
            current_period_end: days_left.map(|d| Utc::now() + Duration::days(d)),
            customer_id: Some("cus_test".to_string()),
            provider_subscription_id: None,
            price_id: None,
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();
    }
}

async fn import(pool: &SqlitePool, source: &str) -> i64 {
    let document = CourseDocument::from_toml(source).unwrap();
    import_course(pool, &document).await.unwrap().course_id
}
