use sqlx::SqlitePool;
use tracing::info;

/// Schema for the local state store.
///
/// One row per collection key, whole-collection JSON blob per row. Safe to
/// call multiple times (idempotent) via `IF NOT EXISTS`.
pub(crate) async fn migrate_app_state(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("App state table migration complete");
    Ok(())
}
