use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::admin::Admin;

/// Stores a fresh magic-link token for `email`, creating the admin on first request.
pub async fn upsert_magic_link(
    pool: &PgPool,
    email: &str,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<Admin, sqlx::Error> {
    sqlx::query_as::<_, Admin>(
        r#"
        INSERT INTO admins (email, magic_link_token, magic_link_expires_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET magic_link_token = EXCLUDED.magic_link_token,
            magic_link_expires_at = EXCLUDED.magic_link_expires_at,
            updated_at = NOW()
        RETURNING id, email, magic_link_token, magic_link_expires_at, created_at
        "#,
    )
    .bind(email)
    .bind(token)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

/// Redeems an unexpired magic-link token, clearing it so it cannot be reused.
pub async fn consume_magic_link(pool: &PgPool, token: &str) -> Result<Option<Admin>, sqlx::Error> {
    sqlx::query_as::<_, Admin>(
        r#"
        UPDATE admins
        SET magic_link_token = NULL,
            magic_link_expires_at = NULL,
            updated_at = NOW()
        WHERE magic_link_token = $1 AND magic_link_expires_at > NOW()
        RETURNING id, email, magic_link_token, magic_link_expires_at, created_at
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}
