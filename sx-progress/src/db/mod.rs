//! Persistence gateway for the progression service
//!
//! [`ProgressStore`] owns the pool and hands out [`UnitOfWork`] handles. Every
//! read that decides a gate and every write it guards go through the same
//! unit of work; dropping one without [`UnitOfWork::commit`] rolls back.
//!
//! Counter updates are relative and clamped in SQL so concurrent requests for
//! the same user never overwrite each other's increments.

pub mod content;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use sx_common::db::{
    Challenge, ChallengeAttempt, Course, Enrollment, Lesson, Subscription, User, MAX_HEARTS,
};
use uuid::Uuid;

use crate::error::{Error, Result};

pub use content::{import_course, CourseDocument, ImportedCourse};

/// Handle on the progression tables
#[derive(Clone)]
pub struct ProgressStore {
    pool: SqlitePool,
}

impl ProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a unit of work that may write
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so a second request for
    /// the same user waits out the busy timeout instead of failing with
    /// `SQLITE_BUSY` on lock upgrade.
    pub async fn begin(&self) -> Result<UnitOfWork> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(UnitOfWork { tx })
    }

    /// Open a read-only unit of work; does not block writers
    pub async fn begin_read(&self) -> Result<UnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(UnitOfWork { tx })
    }

    /// Create a user at signup with full hearts and no points
    ///
    /// Existing users are returned unchanged.
    pub async fn create_user(&self, user_id: &str, name: Option<&str>) -> Result<User> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, hearts, total_points, created_at)
            VALUES (?, ?, ?, 0, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(MAX_HEARTS)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    /// Users ordered by lifetime points, ties broken by name
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            ORDER BY total_points DESC, COALESCE(name, '') ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

/// One transaction's worth of reads and writes
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Point reads
    // ========================================================================

    pub async fn user(&mut self, user_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    pub async fn active_enrollment(&mut self, user_id: &str) -> Result<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = ? AND is_active = 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(enrollment)
    }

    pub async fn enrollment_for_course(
        &mut self,
        user_id: &str,
        course_id: i64,
    ) -> Result<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = ? AND course_id = ?",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(enrollment)
    }

    pub async fn enrollments(&mut self, user_id: &str) -> Result<Vec<Enrollment>> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = ? ORDER BY last_accessed_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(enrollments)
    }

    pub async fn subscription(&mut self, user_id: &str) -> Result<Option<Subscription>> {
        let subscription =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(subscription)
    }

    pub async fn course(&mut self, course_id: i64) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
            .bind(course_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(course)
    }

    pub async fn lesson(&mut self, lesson_id: i64) -> Result<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = ?")
            .bind(lesson_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(lesson)
    }

    pub async fn challenge(&mut self, challenge_id: i64) -> Result<Option<Challenge>> {
        let challenge = sqlx::query_as::<_, Challenge>("SELECT * FROM challenges WHERE id = ?")
            .bind(challenge_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(challenge)
    }

    /// First lesson of the course's first unit, by ordering key
    ///
    /// `None` when the course has no units or its first unit has no lessons.
    pub async fn first_lesson(&mut self, course_id: i64) -> Result<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT * FROM lessons
            WHERE unit_id = (
                SELECT id FROM units WHERE course_id = ? ORDER BY unit_order, id LIMIT 1
            )
            ORDER BY lesson_order, id
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(lesson)
    }

    pub async fn attempt(
        &mut self,
        enrollment_id: i64,
        challenge_id: i64,
    ) -> Result<Option<ChallengeAttempt>> {
        let attempt = sqlx::query_as::<_, ChallengeAttempt>(
            "SELECT * FROM challenge_attempts WHERE enrollment_id = ? AND challenge_id = ?",
        )
        .bind(enrollment_id)
        .bind(challenge_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(attempt)
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Insert or replace a user's entitlement record
    pub async fn upsert_subscription(&mut self, subscription: &Subscription) -> Result<Subscription> {
        let stored = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions
                (user_id, tier, current_period_end, customer_id, provider_subscription_id, price_id, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                tier = excluded.tier,
                current_period_end = excluded.current_period_end,
                customer_id = excluded.customer_id,
                provider_subscription_id = excluded.provider_subscription_id,
                price_id = excluded.price_id,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&subscription.user_id)
        .bind(subscription.tier)
        .bind(subscription.current_period_end)
        .bind(&subscription.customer_id)
        .bind(&subscription.provider_subscription_id)
        .bind(&subscription.price_id)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(stored)
    }

    // ========================================================================
    // Attempts
    // ========================================================================

    /// Record a first, completed attempt
    ///
    /// A concurrent first attempt that committed earlier trips the
    /// (enrollment, challenge) uniqueness constraint and surfaces as
    /// [`Error::PracticeDuplicateRace`].
    pub async fn insert_attempt(
        &mut self,
        user_id: &str,
        enrollment_id: i64,
        challenge_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ChallengeAttempt> {
        let result = sqlx::query_as::<_, ChallengeAttempt>(
            r#"
            INSERT INTO challenge_attempts
                (id, user_id, enrollment_id, challenge_id, completed, completed_at, attempts)
            VALUES (?, ?, ?, ?, 1, ?, 1)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(enrollment_id)
        .bind(challenge_id)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await;

        match result {
            Ok(attempt) => Ok(attempt),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(Error::PracticeDuplicateRace {
                    enrollment_id,
                    challenge_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Mark an existing attempt completed again and count the repeat
    pub async fn complete_practice_attempt(
        &mut self,
        attempt_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ChallengeAttempt> {
        let attempt = sqlx::query_as::<_, ChallengeAttempt>(
            r#"
            UPDATE challenge_attempts
            SET completed = 1, completed_at = ?, attempts = attempts + 1
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(attempt_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(attempt)
    }

    // ========================================================================
    // Counters
    // ========================================================================

    /// Apply relative heart and point changes to an enrollment
    ///
    /// Hearts are clamped to `0..=MAX_HEARTS`; points are not clamped, the
    /// CHECK constraint rejects a negative balance.
    pub async fn adjust_enrollment(
        &mut self,
        enrollment_id: i64,
        hearts_delta: i64,
        points_delta: i64,
        now: DateTime<Utc>,
    ) -> Result<Enrollment> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments
            SET course_hearts = MIN(MAX(course_hearts + ?, 0), ?),
                course_points = course_points + ?,
                last_accessed_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(hearts_delta)
        .bind(MAX_HEARTS)
        .bind(points_delta)
        .bind(now)
        .bind(enrollment_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(enrollment)
    }

    /// Apply relative heart and point changes to the user mirror
    pub async fn adjust_user(
        &mut self,
        user_id: &str,
        hearts_delta: i64,
        points_delta: i64,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET hearts = MIN(MAX(hearts + ?, 0), ?),
                total_points = total_points + ?,
                last_active_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(hearts_delta)
        .bind(MAX_HEARTS)
        .bind(points_delta)
        .bind(now)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(user)
    }

    pub async fn refill_enrollment(
        &mut self,
        enrollment_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Enrollment> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments
            SET course_hearts = ?, last_accessed_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(MAX_HEARTS)
        .bind(now)
        .bind(enrollment_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(enrollment)
    }

    /// Fill the user's hearts and charge `cost` lifetime points
    pub async fn refill_user(
        &mut self,
        user_id: &str,
        cost: i64,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET hearts = ?, total_points = total_points - ?, last_active_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(MAX_HEARTS)
        .bind(cost)
        .bind(now)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(user)
    }

    /// Set the user's heart mirror to an absolute value
    pub async fn sync_user_hearts(&mut self, user_id: &str, hearts: i64) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET hearts = MIN(MAX(?, 0), ?) WHERE id = ? RETURNING *",
        )
        .bind(hearts)
        .bind(MAX_HEARTS)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(user)
    }

    // ========================================================================
    // Enrollments
    // ========================================================================

    /// Deactivate every enrollment of the user except the one for `course_id`
    pub async fn deactivate_other_enrollments(
        &mut self,
        user_id: &str,
        course_id: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE enrollments SET is_active = 0 WHERE user_id = ? AND course_id != ? AND is_active = 1",
        )
        .bind(user_id)
        .bind(course_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Make an existing enrollment the active one; progress is left as is
    ///
    /// A paused or dropped enrollment comes back with status `ACTIVE`.
    pub async fn reactivate_enrollment(
        &mut self,
        enrollment_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Enrollment> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments
            SET is_active = 1, status = 'ACTIVE', last_accessed_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(enrollment_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(enrollment)
    }

    /// Create an enrollment seeded with full hearts, pointing at `first_lesson`
    pub async fn insert_enrollment(
        &mut self,
        user_id: &str,
        course_id: i64,
        first_lesson: &Lesson,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<Enrollment> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments
                (user_id, course_id, is_active, status, course_hearts, course_points,
                 progress_percent, current_unit_id, current_lesson_id, started_at, last_accessed_at)
            VALUES (?, ?, ?, 'ACTIVE', ?, 0, 0, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(is_active)
        .bind(MAX_HEARTS)
        .bind(first_lesson.unit_id)
        .bind(first_lesson.id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(enrollment)
    }

    pub async fn set_current_lesson(
        &mut self,
        enrollment_id: i64,
        lesson: &Lesson,
        now: DateTime<Utc>,
    ) -> Result<Enrollment> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments
            SET current_unit_id = ?, current_lesson_id = ?, last_accessed_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(lesson.unit_id)
        .bind(lesson.id)
        .bind(now)
        .bind(enrollment_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(enrollment)
    }

    // ========================================================================
    // Course progress
    // ========================================================================

    /// Course id that owns a lesson
    pub async fn lesson_course_id(&mut self, lesson_id: i64) -> Result<Option<i64>> {
        let course_id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT u.course_id FROM lessons l
            JOIN units u ON u.id = l.unit_id
            WHERE l.id = ?
            "#,
        )
        .bind(lesson_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(course_id)
    }

    /// Completed and total challenge counts of an enrollment's course
    pub async fn challenge_counts(&mut self, enrollment: &Enrollment) -> Result<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN a.completed = 1 THEN 1 ELSE 0 END), 0),
                COUNT(c.id)
            FROM challenges c
            JOIN lessons l ON l.id = c.lesson_id
            JOIN units u ON u.id = l.unit_id
            LEFT JOIN challenge_attempts a
                ON a.challenge_id = c.id AND a.enrollment_id = ?
            WHERE u.course_id = ?
            "#,
        )
        .bind(enrollment.id)
        .bind(enrollment.course_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(counts)
    }

    pub async fn set_progress_percent(&mut self, enrollment_id: i64, percent: i64) -> Result<()> {
        sqlx::query("UPDATE enrollments SET progress_percent = ? WHERE id = ?")
            .bind(percent)
            .bind(enrollment_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    /// First lesson (unit order, then lesson order) with an uncompleted challenge
    pub async fn first_incomplete_lesson(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT l.* FROM lessons l
            JOIN units u ON u.id = l.unit_id
            WHERE u.course_id = ?
              AND EXISTS (
                SELECT 1 FROM challenges c
                LEFT JOIN challenge_attempts a
                    ON a.challenge_id = c.id AND a.enrollment_id = ?
                WHERE c.lesson_id = l.id AND COALESCE(a.completed, 0) = 0
              )
            ORDER BY u.unit_order, u.id, l.lesson_order, l.id
            LIMIT 1
            "#,
        )
        .bind(enrollment.course_id)
        .bind(enrollment.id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(lesson)
    }
}
