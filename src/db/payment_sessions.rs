use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::payment::{CartItem, PaymentSession};

pub async fn create(
    pool: &PgPool,
    razorpay_order_id: &str,
    customer_id: Uuid,
    address_id: Uuid,
    batch_id: &str,
    amount_paise: i64,
    items: &[CartItem],
) -> Result<PaymentSession, sqlx::Error> {
    sqlx::query_as::<_, PaymentSession>(
        r#"
        INSERT INTO payment_sessions
            (razorpay_order_id, customer_id, address_id, batch_id, amount_paise, items)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(razorpay_order_id)
    .bind(customer_id)
    .bind(address_id)
    .bind(batch_id)
    .bind(amount_paise)
    .bind(Json(items))
    .fetch_one(pool)
    .await
}

/// Locks the PENDING session for a Razorpay order. `None` when it is missing or already settled.
pub async fn lock_pending(
    tx: &mut Transaction<'_, Postgres>,
    razorpay_order_id: &str,
) -> Result<Option<PaymentSession>, sqlx::Error> {
    sqlx::query_as::<_, PaymentSession>(
        r#"
        SELECT * FROM payment_sessions
        WHERE razorpay_order_id = $1 AND status = 'PENDING'
        FOR UPDATE
        "#,
    )
    .bind(razorpay_order_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn find_pending(
    pool: &PgPool,
    razorpay_order_id: &str,
) -> Result<Option<PaymentSession>, sqlx::Error> {
    sqlx::query_as::<_, PaymentSession>(
        "SELECT * FROM payment_sessions WHERE razorpay_order_id = $1 AND status = 'PENDING'",
    )
    .bind(razorpay_order_id)
    .fetch_optional(pool)
    .await
}

pub async fn mark_completed(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE payment_sessions SET status = 'COMPLETED', completed_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Marks PENDING sessions created before `cutoff` as EXPIRED. Returns how many changed.
pub async fn expire_stale(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payment_sessions SET status = 'EXPIRED' WHERE status = 'PENDING' AND created_at < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
