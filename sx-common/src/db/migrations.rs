//! Database schema migrations
//!
//! Versioned, idempotent schema changes applied after the base tables exist.
//! Each migration runs once and is recorded in `schema_version`.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field have already applied them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Keep them idempotent** - `IF NOT EXISTS` or check `pragma_table_info` first

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if no migration has been recorded yet
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: at most one active enrollment per user
///
/// A partial unique index rejects a second `is_active = 1` row for the same
/// user, so activation must deactivate before it activates.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let duplicates: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM (
            SELECT user_id FROM enrollments
            WHERE is_active = 1
            GROUP BY user_id
            HAVING COUNT(*) > 1
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if duplicates > 0 {
        // Keep the most recently accessed enrollment active
        warn!(
            "Migration v1: {} users have several active enrollments, keeping the latest",
            duplicates
        );
        sqlx::query(
            r#"
            UPDATE enrollments SET is_active = 0
            WHERE is_active = 1
              AND id NOT IN (
                SELECT e.id FROM enrollments e
                WHERE e.is_active = 1
                  AND e.last_accessed_at = (
                    SELECT MAX(last_accessed_at) FROM enrollments
                    WHERE user_id = e.user_id AND is_active = 1
                  )
                GROUP BY e.user_id
              )
            "#,
        )
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_enrollments_one_active
        ON enrollments(user_id) WHERE is_active = 1
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Migration v2: leaderboard ordering index
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_users_total_points ON users(total_points DESC, name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
