use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::address::{Address, NewAddress, UpdateAddressRequest};

/// Inserts an address. A new default address clears the previous default in the same transaction.
pub async fn create(
    pool: &PgPool,
    customer_id: Uuid,
    new: &NewAddress,
) -> Result<Address, sqlx::Error> {
    let mut tx = pool.begin().await?;

    if new.is_default {
        clear_default(&mut *tx, customer_id).await?;
    }

    let address = sqlx::query_as::<_, Address>(
        r#"
        INSERT INTO addresses
            (customer_id, name, phone, address_line1, address_line2, city, state, pincode, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(customer_id)
    .bind(&new.name)
    .bind(&new.phone)
    .bind(&new.address_line1)
    .bind(new.address_line2.as_deref())
    .bind(&new.city)
    .bind(&new.state)
    .bind(&new.pincode)
    .bind(new.is_default)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(address)
}

/// Partial update of one of the customer's own addresses. `None` if it is not theirs.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    customer_id: Uuid,
    req: &UpdateAddressRequest,
) -> Result<Option<Address>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    if req.is_default == Some(true) {
        clear_default(&mut *tx, customer_id).await?;
    }

    let trim = |v: &Option<String>| v.as_deref().map(|s| s.trim().to_string());
    let line2 = req
        .address_line2
        .as_ref()
        .map(|v| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string));

    let address = sqlx::query_as::<_, Address>(
        r#"
        UPDATE addresses
        SET name = COALESCE($3, name),
            phone = COALESCE($4, phone),
            address_line1 = COALESCE($5, address_line1),
            address_line2 = CASE WHEN $6 THEN $7 ELSE address_line2 END,
            city = COALESCE($8, city),
            state = COALESCE($9, state),
            pincode = COALESCE($10, pincode),
            is_default = COALESCE($11, is_default),
            updated_at = NOW()
        WHERE id = $1 AND customer_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(customer_id)
    .bind(trim(&req.name))
    .bind(trim(&req.phone))
    .bind(trim(&req.address_line1))
    .bind(line2.is_some())
    .bind(line2.flatten())
    .bind(trim(&req.city))
    .bind(trim(&req.state))
    .bind(trim(&req.pincode))
    .bind(req.is_default)
    .fetch_optional(&mut *tx)
    .await?;

    if address.is_some() {
        tx.commit().await?;
    }
    Ok(address)
}

/// Returns false when the address does not exist or belongs to someone else.
pub async fn delete(pool: &PgPool, id: Uuid, customer_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND customer_id = $2")
        .bind(id)
        .bind(customer_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Default address first, then oldest first.
pub async fn list_by_customer(
    pool: &PgPool,
    customer_id: Uuid,
) -> Result<Vec<Address>, sqlx::Error> {
    sqlx::query_as::<_, Address>(
        r#"
        SELECT * FROM addresses
        WHERE customer_id = $1
        ORDER BY is_default DESC, created_at ASC
        "#,
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
}

pub async fn get_for_customer<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    customer_id: Uuid,
) -> Result<Option<Address>, sqlx::Error> {
    sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1 AND customer_id = $2")
        .bind(id)
        .bind(customer_id)
        .fetch_optional(executor)
        .await
}

pub async fn get_default<'e, E: PgExecutor<'e>>(
    executor: E,
    customer_id: Uuid,
) -> Result<Option<Address>, sqlx::Error> {
    sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE customer_id = $1 AND is_default = TRUE LIMIT 1",
    )
    .bind(customer_id)
    .fetch_optional(executor)
    .await
}

pub async fn get_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Address>, sqlx::Error> {
    sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}

async fn clear_default<'e, E: PgExecutor<'e>>(
    executor: E,
    customer_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE customer_id = $1 AND is_default")
        .bind(customer_id)
        .execute(executor)
        .await?;
    Ok(())
}
