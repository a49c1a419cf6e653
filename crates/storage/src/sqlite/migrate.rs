use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

const CURRENT_VERSION: i64 = 1;

/// Brings the schema up to date.
///
/// The `progress` table is created with `IF NOT EXISTS` on every call, so a
/// table dropped behind the application's back comes back empty while the
/// `schema_migrations` bookkeeping stays untouched.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    let applied = is_applied(pool, CURRENT_VERSION).await?;
    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS progress (
                lesson_id TEXT PRIMARY KEY,
                completed INTEGER DEFAULT 0
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    if !applied {
        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(CURRENT_VERSION)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        info!(version = CURRENT_VERSION, "applied schema migration");
    }

    tx.commit().await?;
    Ok(())
}
