//! Database schema management for `smartaqua-alerts`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates `thresholds` (single settings row), `device_tokens` (push token
/// registry), `store_values` (scalar write path) and `activity_log`. Safe to
/// call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // User-edited thresholds; exactly one row (id = 1)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS thresholds (
            id               SMALLINT    PRIMARY KEY CHECK (id = 1),
            min_ph           DOUBLE PRECISION NOT NULL,
            max_ph           DOUBLE PRECISION NOT NULL,
            min_water_level  DOUBLE PRECISION NOT NULL,
            max_water_level  DOUBLE PRECISION NOT NULL,
            low_water_level  DOUBLE PRECISION,
            push_enabled     BOOLEAN     NOT NULL,
            email_enabled    BOOLEAN     NOT NULL,
            email_address    TEXT,
            updated_at       TIMESTAMPTZ NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // One push token per user
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_tokens (
            user_id        TEXT        PRIMARY KEY,
            token          TEXT        NOT NULL,
            platform       TEXT,
            registered_at  TIMESTAMPTZ NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS store_values (
            path        TEXT        PRIMARY KEY,
            value       DOUBLE PRECISION NOT NULL,
            updated_at  TIMESTAMPTZ NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Activity log read by `/activity`
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activity_log (
            id         UUID        PRIMARY KEY,
            logged_at  TIMESTAMPTZ NOT NULL,
            icon       TEXT        NOT NULL,
            message    TEXT        NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_activity_log_logged_at
            ON activity_log (logged_at DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
