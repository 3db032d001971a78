//! Database migrations

use crate::DbPool;
use shelfcast_core::AppError;

/// Migration 001: Cached books, files, chapters and progress
const MIGRATION_001: &str = include_str!("../migrations/001_cached_books.sql");

/// Migration 002: Bookmarks
const MIGRATION_002: &str = include_str!("../migrations/002_cached_bookmarks.sql");

/// Migration 003: Indexes
const MIGRATION_003: &str = include_str!("../migrations/003_indexes.sql");

const MIGRATIONS: [(i64, &str); 3] = [(1, MIGRATION_001), (2, MIGRATION_002), (3, MIGRATION_003)];

/// Current database schema version
pub const CURRENT_VERSION: i64 = 3;

/// Returns the current migration version
pub fn current_version() -> i64 {
    CURRENT_VERSION
}

/// Runs all pending migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to create migrations table", e))?;

    for (version, sql) in MIGRATIONS {
        run_migration(pool, version, sql).await?;
    }

    Ok(())
}

/// Returns the highest applied migration, 0 on a fresh database
pub async fn applied_version(pool: &DbPool) -> Result<i64, AppError> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::database("Failed to read schema version", e))?;

    Ok(version.unwrap_or(0))
}

/// Runs a single migration if not already applied
///
/// The schema change and its version row are committed together.
async fn run_migration(pool: &DbPool, version: i64, sql: &str) -> Result<(), AppError> {
    let applied: Option<i64> =
        sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = ?")
            .bind(version)
            .fetch_optional(pool)
            .await
            .map_err(|e| AppError::database("Failed to check migration status", e))?;

    if applied.is_some() {
        return Ok(());
    }

    let failed = |e: sqlx::Error| AppError::MigrationFailed {
        version: version.to_string(),
        reason: e.to_string(),
    };

    let mut tx = pool.begin().await.map_err(failed)?;

    sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(failed)?;

    sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;

    tx.commit().await.map_err(failed)?;

    log::info!("Applied cache migration {}", version);
    Ok(())
}

/// Verifies database integrity
pub async fn verify_integrity(pool: &DbPool) -> Result<(), AppError> {
    let result: String = sqlx::query_scalar("PRAGMA integrity_check")
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::database("Failed to check integrity", e))?;

    if result != "ok" {
        return Err(AppError::DatabaseCorrupted { details: result });
    }

    Ok(())
}

/// Optimizes the database
pub async fn optimize(pool: &DbPool) -> Result<(), AppError> {
    sqlx::query("PRAGMA optimize")
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to optimize database", e))?;

    Ok(())
}
