//! Activity log stored in PostgreSQL, read back by the logs screen.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::ActivityLog;
use crate::error::ChannelError;

// ---

/// One line of the activity log.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub logged_at: DateTime<Utc>,
    pub icon: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct PgActivityLog {
    pool: PgPool,
    timeout: Duration,
}

impl PgActivityLog {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Most recent entries first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<ActivityEntry>, sqlx::Error> {
        // ---
        sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT id, logged_at, icon, message
            FROM activity_log
            ORDER BY logged_at DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl ActivityLog for PgActivityLog {
    async fn append(&self, at: DateTime<Utc>, icon: &str, message: &str) -> Result<(), ChannelError> {
        // ---
        let insert = sqlx::query(
            r#"
            INSERT INTO activity_log (id, logged_at, icon, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(at)
        .bind(icon)
        .bind(message)
        .execute(&self.pool);

        match tokio::time::timeout(self.timeout, insert).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(ChannelError::Timeout(self.timeout)),
        }
    }
}
