use std::collections::HashMap;

use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::jar::{
    Jar, JarDetail, JarFilter, JarSize, JarWithBatch, StockAvailability, UpdateJarRequest,
};

use super::{batches, customers};

pub async fn create(
    pool: &PgPool,
    jar_id: &str,
    batch_id: Uuid,
    size: JarSize,
) -> Result<Jar, sqlx::Error> {
    sqlx::query_as::<_, Jar>(
        "INSERT INTO jars (jar_id, batch_id, size) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(jar_id)
    .bind(batch_id)
    .bind(size)
    .fetch_one(pool)
    .await
}

/// Inserts `count` AVAILABLE jars with fresh UUID jar ids in one transaction.
pub async fn create_many(
    pool: &PgPool,
    batch_id: Uuid,
    size: JarSize,
    count: usize,
) -> Result<Vec<Jar>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut jars = Vec::with_capacity(count);
    for _ in 0..count {
        let jar = sqlx::query_as::<_, Jar>(
            "INSERT INTO jars (jar_id, batch_id, size) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(batch_id)
        .bind(size)
        .fetch_one(&mut *tx)
        .await?;
        jars.push(jar);
    }
    tx.commit().await?;
    Ok(jars)
}

/// Newest first, each with its batch. `batch_id` in the filter is the batch row id.
pub async fn list(
    pool: &PgPool,
    batch_id: Option<Uuid>,
    filter: &JarFilter,
) -> Result<Vec<JarWithBatch>, sqlx::Error> {
    let jars = sqlx::query_as::<_, Jar>(
        r#"
        SELECT * FROM jars
        WHERE ($1::uuid IS NULL OR batch_id = $1)
          AND ($2::jar_status IS NULL OR status = $2)
          AND ($3::jar_size IS NULL OR size = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(batch_id)
    .bind(filter.status)
    .bind(filter.size)
    .fetch_all(pool)
    .await?;
    with_batches(pool, jars).await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Jar>, sqlx::Error> {
    sqlx::query_as::<_, Jar>("SELECT * FROM jars WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn detail(pool: &PgPool, id: Uuid) -> Result<Option<JarDetail>, sqlx::Error> {
    let Some(jar) = get(pool, id).await? else {
        return Ok(None);
    };
    let Some(batch) = batches::get(pool, jar.batch_id).await? else {
        return Ok(None);
    };
    let customer = match jar.customer_id {
        Some(customer_id) => customers::get(pool, customer_id).await?,
        None => None,
    };
    Ok(Some(JarDetail {
        jar,
        batch,
        customer,
    }))
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateJarRequest,
) -> Result<Option<Jar>, sqlx::Error> {
    sqlx::query_as::<_, Jar>(
        r#"
        UPDATE jars
        SET status = COALESCE($2, status),
            customer_id = CASE WHEN $3 THEN $4 ELSE customer_id END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.status)
    .bind(req.customer_id.is_some())
    .bind(req.customer_id.flatten())
    .fetch_optional(pool)
    .await
}

pub async fn list_by_customer(pool: &PgPool, customer_id: Uuid) -> Result<Vec<Jar>, sqlx::Error> {
    sqlx::query_as::<_, Jar>(
        "SELECT * FROM jars WHERE customer_id = $1 ORDER BY updated_at DESC",
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
}

pub async fn get_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Jar>, sqlx::Error> {
    sqlx::query_as::<_, Jar>("SELECT * FROM jars WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}

/// Locks a specific AVAILABLE jar by its printed id. Already-locked rows are skipped.
pub async fn lock_available_by_jar_id(
    tx: &mut Transaction<'_, Postgres>,
    jar_id: &str,
) -> Result<Option<Jar>, sqlx::Error> {
    sqlx::query_as::<_, Jar>(
        r#"
        SELECT * FROM jars
        WHERE jar_id = $1 AND status = 'AVAILABLE'
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(jar_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Locks the oldest AVAILABLE jar of a batch and size. Already-locked rows are skipped.
pub async fn lock_available(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: Uuid,
    size: JarSize,
) -> Result<Option<Jar>, sqlx::Error> {
    sqlx::query_as::<_, Jar>(
        r#"
        SELECT * FROM jars
        WHERE batch_id = $1 AND size = $2 AND status = 'AVAILABLE'
        ORDER BY created_at ASC
        LIMIT 1
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(batch_id)
    .bind(size)
    .fetch_optional(&mut **tx)
    .await
}

/// Marks a jar SOLD to a customer. Only succeeds while the jar is still AVAILABLE.
pub async fn mark_sold<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    customer_id: Uuid,
) -> Result<Option<Jar>, sqlx::Error> {
    sqlx::query_as::<_, Jar>(
        r#"
        UPDATE jars
        SET status = 'SOLD', customer_id = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'AVAILABLE'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(customer_id)
    .fetch_optional(executor)
    .await
}

/// AVAILABLE jar counts per size for one batch. Sizes with no jars count as zero.
pub async fn availability(pool: &PgPool, batch_id: Uuid) -> Result<StockAvailability, sqlx::Error> {
    let rows: Vec<(JarSize, i64)> = sqlx::query_as(
        r#"
        SELECT size, COUNT(*) AS count
        FROM jars
        WHERE batch_id = $1 AND status = 'AVAILABLE'
        GROUP BY size
        "#,
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    let mut stock = StockAvailability::default();
    for (size, count) in rows {
        stock.set(size, count);
    }
    Ok(stock)
}

pub async fn count_available(
    pool: &PgPool,
    batch_id: Uuid,
    size: JarSize,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM jars WHERE batch_id = $1 AND size = $2 AND status = 'AVAILABLE'",
    )
    .bind(batch_id)
    .bind(size)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn with_batches(
    pool: &PgPool,
    jars: Vec<Jar>,
) -> Result<Vec<JarWithBatch>, sqlx::Error> {
    let ids: Vec<Uuid> = jars.iter().map(|j| j.batch_id).collect();
    let batches: HashMap<_, _> = batches::get_many(pool, &ids)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();

    Ok(jars
        .into_iter()
        .filter_map(|jar| {
            let batch = batches.get(&jar.batch_id)?.clone();
            Some(JarWithBatch { jar, batch })
        })
        .collect())
}
