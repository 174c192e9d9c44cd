//! PostgreSQL side of the reading store: thresholds, the device-token
//! registry and scalar bookkeeping values.
//!
//! Live sensor values are not stored here; they arrive as change
//! notifications and go straight to the [`crate::monitor::Monitor`].

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::ChannelError;
use crate::models::ThresholdConfig;
use crate::monitor::RecipientSource;

// ---

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Stored thresholds, or `None` if settings were never saved.
    pub async fn load_thresholds(&self) -> Result<Option<ThresholdConfig>, sqlx::Error> {
        // ---
        sqlx::query_as::<_, ThresholdConfig>(
            r#"
            SELECT min_ph, max_ph, min_water_level, max_water_level, low_water_level,
                   push_enabled, email_enabled, email_address
            FROM thresholds
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
    }

    /// Upsert the single thresholds row.
    pub async fn save_thresholds(&self, cfg: &ThresholdConfig) -> Result<(), sqlx::Error> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO thresholds (
                id, min_ph, max_ph, min_water_level, max_water_level, low_water_level,
                push_enabled, email_enabled, email_address, updated_at
            ) VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (id) DO UPDATE SET
                min_ph          = EXCLUDED.min_ph,
                max_ph          = EXCLUDED.max_ph,
                min_water_level = EXCLUDED.min_water_level,
                max_water_level = EXCLUDED.max_water_level,
                low_water_level = EXCLUDED.low_water_level,
                push_enabled    = EXCLUDED.push_enabled,
                email_enabled   = EXCLUDED.email_enabled,
                email_address   = EXCLUDED.email_address,
                updated_at      = EXCLUDED.updated_at
            "#,
        )
        .bind(cfg.min_ph)
        .bind(cfg.max_ph)
        .bind(cfg.min_water_level)
        .bind(cfg.max_water_level)
        .bind(cfg.low_water_level)
        .bind(cfg.push_enabled)
        .bind(cfg.email_enabled)
        .bind(&cfg.email_address)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// One token per user; re-registering replaces the previous device.
    pub async fn register_token(
        &self,
        user_id: &str,
        token: &str,
        platform: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO device_tokens (user_id, token, platform, registered_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                token         = EXCLUDED.token,
                platform      = EXCLUDED.platform,
                registered_at = EXCLUDED.registered_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(platform)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns `false` if the user had no token.
    pub async fn unregister_token(&self, user_id: &str) -> Result<bool, sqlx::Error> {
        // ---
        let result = sqlx::query("DELETE FROM device_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write a scalar at `path`, e.g. `last_water_change`.
    pub async fn set_scalar(&self, path: &str, value: f64) -> Result<(), sqlx::Error> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO store_values (path, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (path) DO UPDATE SET
                value      = EXCLUDED.value,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(path)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RecipientSource for PgStore {
    async fn push_tokens(&self) -> Result<Vec<String>, ChannelError> {
        // ---
        let tokens = sqlx::query_scalar::<_, String>("SELECT token FROM device_tokens")
            .fetch_all(&self.pool)
            .await?;

        Ok(tokens)
    }
}
