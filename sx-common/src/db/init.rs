//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas and
//! builds the schema idempotently. Storage-level guards back the progression
//! invariants: unique (user, course) enrollments, unique (enrollment,
//! challenge) attempts, and CHECK bounds on hearts and points.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open (creating if needed) the database file and bring the schema up to date
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Options apply to every connection the pool opens, unlike a one-off PRAGMA
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// The pool never recycles its connection, since closing it would discard
/// the database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent) and run pending migrations
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_users_table(pool).await?;

    // Content tree
    create_courses_table(pool).await?;
    create_units_table(pool).await?;
    create_lessons_table(pool).await?;
    create_challenges_table(pool).await?;

    // Learner state
    create_enrollments_table(pool).await?;
    create_challenge_attempts_table(pool).await?;
    create_subscriptions_table(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the users table
///
/// `hearts` and `total_points` mirror the active enrollment for display.
pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT,
            hearts INTEGER NOT NULL DEFAULT 5,
            total_points INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_active_at TIMESTAMP,
            CHECK (hearts >= 0 AND hearts <= 5),
            CHECK (total_points >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            language TEXT,
            is_public INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_units_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS units (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            unit_order INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_units_course ON units(course_id, unit_order)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_lessons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lessons (
            id INTEGER PRIMARY KEY,
            unit_id INTEGER NOT NULL REFERENCES units(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            lesson_order INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_lessons_unit ON lessons(unit_id, lesson_order)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_challenges_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS challenges (
            id INTEGER PRIMARY KEY,
            lesson_id INTEGER NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            question TEXT NOT NULL,
            challenge_order INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_challenges_lesson ON challenges(lesson_id, challenge_order)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the enrollments table
///
/// One row per (user, course). Hearts are clamped to 0..=5 by CHECK so a
/// faulty update aborts its transaction instead of persisting.
pub async fn create_enrollments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrollments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            is_active INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            course_hearts INTEGER NOT NULL DEFAULT 5,
            course_points INTEGER NOT NULL DEFAULT 0,
            progress_percent INTEGER NOT NULL DEFAULT 0,
            current_unit_id INTEGER REFERENCES units(id) ON DELETE SET NULL,
            current_lesson_id INTEGER REFERENCES lessons(id) ON DELETE SET NULL,
            started_at TIMESTAMP NOT NULL,
            last_accessed_at TIMESTAMP NOT NULL,
            UNIQUE (user_id, course_id),
            CHECK (status IN ('ACTIVE', 'PAUSED', 'COMPLETED', 'DROPPED')),
            CHECK (course_hearts >= 0 AND course_hearts <= 5),
            CHECK (course_points >= 0),
            CHECK (progress_percent >= 0 AND progress_percent <= 100)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_enrollments_user ON enrollments(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the challenge_attempts table
///
/// A repeat attempt updates the existing row; the UNIQUE constraint turns a
/// duplicate insert into an error.
pub async fn create_challenge_attempts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS challenge_attempts (
            id BLOB PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            enrollment_id INTEGER NOT NULL REFERENCES enrollments(id) ON DELETE CASCADE,
            challenge_id INTEGER NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
            completed INTEGER NOT NULL DEFAULT 0,
            completed_at TIMESTAMP,
            attempts INTEGER NOT NULL DEFAULT 0,
            score INTEGER,
            UNIQUE (enrollment_id, challenge_id),
            CHECK (attempts >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_subscriptions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            tier TEXT NOT NULL DEFAULT 'FREE',
            current_period_end TIMESTAMP,
            customer_id TEXT,
            provider_subscription_id TEXT UNIQUE,
            price_id TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (tier IN ('FREE', 'PRO'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
