use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// Unused OTPs issued to `phone` since `since`.
pub async fn count_recent_unused(
    pool: &PgPool,
    phone: &str,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS count
        FROM otps
        WHERE phone = $1 AND created_at >= $2 AND used = FALSE
        "#,
    )
    .bind(phone)
    .bind(since)
    .fetch_one(pool)
    .await?;

    row.try_get("count")
}

pub async fn create(
    pool: &PgPool,
    phone: &str,
    otp_code: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO otps (phone, otp_code, expires_at) VALUES ($1, $2, $3)")
        .bind(phone)
        .bind(otp_code)
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Marks the newest matching, unexpired, unused OTP as used.
/// Returns false when no such OTP exists.
pub async fn consume(pool: &PgPool, phone: &str, otp_code: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE otps
        SET used = TRUE
        WHERE id = (
            SELECT id FROM otps
            WHERE phone = $1 AND otp_code = $2 AND expires_at > NOW() AND used = FALSE
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
        )
        "#,
    )
    .bind(phone)
    .bind(otp_code)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Deletes OTPs that expired before `before`. Returns the number removed.
pub async fn delete_expired(pool: &PgPool, before: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM otps WHERE expires_at < $1")
        .bind(before)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
