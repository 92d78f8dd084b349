use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::customer::{
    CreateCustomerRequest, Customer, CustomerWithOrderCount, OrderCount, UpdateCustomerRequest,
};

use super::like_pattern;

#[derive(sqlx::FromRow)]
struct CustomerCountRow {
    #[sqlx(flatten)]
    customer: Customer,
    order_count: i64,
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Find the customer for a normalized phone number, creating one on first login.
pub async fn find_or_create_by_phone<'e, E: PgExecutor<'e>>(
    executor: E,
    phone: &str,
) -> Result<Customer, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (phone)
        VALUES ($1)
        ON CONFLICT (phone) DO UPDATE SET phone = EXCLUDED.phone
        RETURNING *
        "#,
    )
    .bind(phone)
    .fetch_one(executor)
    .await
}

pub async fn create(pool: &PgPool, req: &CreateCustomerRequest) -> Result<Customer, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (name, phone, email, notes)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.phone.as_deref())
    .bind(req.email.as_deref())
    .bind(req.notes.as_deref())
    .fetch_one(pool)
    .await
}

/// Partial update. Returns `RowNotFound` when the id does not exist.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateCustomerRequest,
) -> Result<Customer, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers
        SET name = COALESCE($2, name),
            phone = CASE WHEN $3 THEN $4 ELSE phone END,
            email = CASE WHEN $5 THEN $6 ELSE email END,
            first_order_batch_id = CASE WHEN $7 THEN $8 ELSE first_order_batch_id END,
            repeat_count = COALESCE($9, repeat_count),
            complaints = CASE WHEN $10 THEN $11 ELSE complaints END,
            notes = CASE WHEN $12 THEN $13 ELSE notes END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.name.as_deref())
    .bind(req.phone.is_some())
    .bind(req.phone.clone().flatten())
    .bind(req.email.is_some())
    .bind(req.email.clone().flatten())
    .bind(req.first_order_batch_id.is_some())
    .bind(req.first_order_batch_id.flatten())
    .bind(req.repeat_count)
    .bind(req.complaints.is_some())
    .bind(req.complaints.clone().flatten())
    .bind(req.notes.is_some())
    .bind(req.notes.clone().flatten())
    .fetch_one(pool)
    .await
}

/// Newest first, optionally filtered by a case-insensitive match on name, email or phone.
pub async fn list_with_order_counts(
    pool: &PgPool,
    search: Option<&str>,
) -> Result<Vec<CustomerWithOrderCount>, sqlx::Error> {
    let pattern = search.map(like_pattern);
    let rows = sqlx::query_as::<_, CustomerCountRow>(
        r#"
        SELECT c.*,
               (SELECT COUNT(*) FROM orders o WHERE o.customer_id = c.id) AS order_count
        FROM customers c
        WHERE $1::text IS NULL
           OR c.name ILIKE $1
           OR c.email ILIKE $1
           OR c.phone ILIKE $1
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| CustomerWithOrderCount {
            customer: r.customer,
            count: OrderCount {
                orders: r.order_count,
            },
        })
        .collect())
}

pub async fn get_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}
