use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::batch::{
    Batch, BatchFilter, BatchStatus, BatchWithFarm, BatchWithReports, NewBatch,
    UpdateBatchRequest,
};
use crate::models::farm::Farm;

use super::{farms, lab_reports};

pub async fn create(pool: &PgPool, new: &NewBatch) -> Result<Batch, sqlx::Error> {
    sqlx::query_as::<_, Batch>(
        r#"
        INSERT INTO batches
            (batch_id, farm_id, date, cows_count, milk_liters, ghee_output_liters, processing_notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&new.batch_id)
    .bind(new.farm_id)
    .bind(new.date)
    .bind(new.cows_count)
    .bind(new.milk_liters)
    .bind(new.ghee_output_liters)
    .bind(new.processing_notes.as_deref())
    .fetch_one(pool)
    .await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Batch>, sqlx::Error> {
    sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Looks up by the human id, case-insensitively.
pub async fn find_by_batch_id<'e, E: PgExecutor<'e>>(
    executor: E,
    batch_id: &str,
) -> Result<Option<Batch>, sqlx::Error> {
    sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE batch_id = UPPER(TRIM($1))")
        .bind(batch_id)
        .fetch_optional(executor)
        .await
}

/// Accepts either the row UUID or the human batch id.
pub async fn resolve(pool: &PgPool, reference: &str) -> Result<Option<Batch>, sqlx::Error> {
    match Uuid::parse_str(reference.trim()) {
        Ok(id) => get(pool, id).await,
        Err(_) => find_by_batch_id(pool, reference).await,
    }
}

pub async fn get_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Batch>, sqlx::Error> {
    sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}

pub async fn list_by_farm(pool: &PgPool, farm_id: Uuid) -> Result<Vec<Batch>, sqlx::Error> {
    sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE farm_id = $1 ORDER BY date DESC")
        .bind(farm_id)
        .fetch_all(pool)
        .await
}

/// Newest production date first, each with its farm.
pub async fn list(pool: &PgPool, filter: &BatchFilter) -> Result<Vec<BatchWithFarm>, sqlx::Error> {
    let batches = sqlx::query_as::<_, Batch>(
        r#"
        SELECT * FROM batches
        WHERE ($1::batch_status IS NULL OR status = $1)
          AND ($2::uuid IS NULL OR farm_id = $2)
        ORDER BY date DESC
        "#,
    )
    .bind(filter.status)
    .bind(filter.farm_id)
    .fetch_all(pool)
    .await?;

    let farms = load_farms(pool, &batches).await?;
    Ok(batches
        .into_iter()
        .filter_map(|batch| {
            let farm = farms.get(&batch.farm_id)?.clone();
            Some(BatchWithFarm { batch, farm })
        })
        .collect())
}

/// Partial update. `date` is the already-parsed form of `req.date`.
/// Returns `None` when the batch does not exist.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateBatchRequest,
    date: Option<DateTime<Utc>>,
) -> Result<Option<Batch>, sqlx::Error> {
    sqlx::query_as::<_, Batch>(
        r#"
        UPDATE batches
        SET farm_id = COALESCE($2, farm_id),
            date = COALESCE($3, date),
            cows_count = COALESCE($4, cows_count),
            milk_liters = COALESCE($5, milk_liters),
            ghee_output_liters = COALESCE($6, ghee_output_liters),
            processing_notes = CASE WHEN $7 THEN $8 ELSE processing_notes END,
            status = COALESCE($9, status),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.farm_id)
    .bind(date)
    .bind(req.cows_count)
    .bind(req.milk_liters)
    .bind(req.ghee_output_liters)
    .bind(req.processing_notes.is_some())
    .bind(req.processing_notes.clone().flatten())
    .bind(req.status)
    .fetch_optional(pool)
    .await
}

pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    status: BatchStatus,
) -> Result<Option<Batch>, sqlx::Error> {
    sqlx::query_as::<_, Batch>(
        "UPDATE batches SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await
}

/// Approved batches, newest first, with farm and lab reports.
pub async fn list_public(pool: &PgPool) -> Result<Vec<BatchWithReports>, sqlx::Error> {
    let batches = sqlx::query_as::<_, Batch>(
        "SELECT * FROM batches WHERE status = 'APPROVED' ORDER BY date DESC",
    )
    .fetch_all(pool)
    .await?;
    with_reports(pool, batches).await
}

/// A single batch by human id with farm and lab reports.
pub async fn public_detail(
    pool: &PgPool,
    batch_id: &str,
) -> Result<Option<BatchWithReports>, sqlx::Error> {
    let Some(batch) = find_by_batch_id(pool, batch_id).await? else {
        return Ok(None);
    };
    Ok(with_reports(pool, vec![batch]).await?.into_iter().next())
}

pub async fn latest_approved(pool: &PgPool) -> Result<Option<Batch>, sqlx::Error> {
    sqlx::query_as::<_, Batch>(
        "SELECT * FROM batches WHERE status = 'APPROVED' ORDER BY date DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

async fn load_farms(pool: &PgPool, batches: &[Batch]) -> Result<HashMap<Uuid, Farm>, sqlx::Error> {
    let ids: Vec<Uuid> = batches.iter().map(|b| b.farm_id).collect();
    Ok(farms::get_many(pool, &ids)
        .await?
        .into_iter()
        .map(|f| (f.id, f))
        .collect())
}

async fn with_reports(
    pool: &PgPool,
    batches: Vec<Batch>,
) -> Result<Vec<BatchWithReports>, sqlx::Error> {
    let farms = load_farms(pool, &batches).await?;
    let ids: Vec<Uuid> = batches.iter().map(|b| b.id).collect();
    let mut reports = lab_reports::list_by_batches(pool, &ids).await?;

    Ok(batches
        .into_iter()
        .filter_map(|batch| {
            let farm = farms.get(&batch.farm_id)?.clone();
            let lab_reports = reports.remove(&batch.id).unwrap_or_default();
            Some(BatchWithReports {
                batch,
                farm,
                lab_reports,
            })
        })
        .collect())
}
