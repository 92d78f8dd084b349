use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::lab_report::{LabReport, LabReportWithBatch, NewLabReport};

use super::batches;

pub async fn create(pool: &PgPool, new: &NewLabReport) -> Result<LabReport, sqlx::Error> {
    sqlx::query_as::<_, LabReport>(
        r#"
        INSERT INTO lab_reports
            (batch_id, report_url, fat_percent, moisture, ffa, antibiotic_pass, remarks)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(new.batch_id)
    .bind(&new.report_url)
    .bind(new.fat_percent)
    .bind(new.moisture)
    .bind(new.ffa)
    .bind(new.antibiotic_pass)
    .bind(new.remarks.as_deref())
    .fetch_one(pool)
    .await
}

/// Newest first, each with its batch.
pub async fn list(pool: &PgPool) -> Result<Vec<LabReportWithBatch>, sqlx::Error> {
    let reports = sqlx::query_as::<_, LabReport>("SELECT * FROM lab_reports ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;
    attach_batches(pool, reports).await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<LabReportWithBatch>, sqlx::Error> {
    let report = sqlx::query_as::<_, LabReport>("SELECT * FROM lab_reports WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match report {
        Some(r) => Ok(attach_batches(pool, vec![r]).await?.into_iter().next()),
        None => Ok(None),
    }
}

pub async fn list_by_batch(pool: &PgPool, batch_id: Uuid) -> Result<Vec<LabReport>, sqlx::Error> {
    sqlx::query_as::<_, LabReport>(
        "SELECT * FROM lab_reports WHERE batch_id = $1 ORDER BY created_at DESC",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await
}

/// Reports for several batches, grouped by batch, newest first within each group.
pub async fn list_by_batches(
    pool: &PgPool,
    batch_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<LabReport>>, sqlx::Error> {
    let reports = sqlx::query_as::<_, LabReport>(
        "SELECT * FROM lab_reports WHERE batch_id = ANY($1) ORDER BY created_at DESC",
    )
    .bind(batch_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<LabReport>> = HashMap::new();
    for report in reports {
        grouped.entry(report.batch_id).or_default().push(report);
    }
    Ok(grouped)
}

/// Deletes the row and returns it so the caller can remove the stored file.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<LabReport>, sqlx::Error> {
    sqlx::query_as::<_, LabReport>("DELETE FROM lab_reports WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
}

async fn attach_batches(
    pool: &PgPool,
    reports: Vec<LabReport>,
) -> Result<Vec<LabReportWithBatch>, sqlx::Error> {
    let ids: Vec<Uuid> = reports.iter().map(|r| r.batch_id).collect();
    let batches: HashMap<_, _> = batches::get_many(pool, &ids)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();

    Ok(reports
        .into_iter()
        .filter_map(|report| {
            let batch = batches.get(&report.batch_id)?.clone();
            Some(LabReportWithBatch { report, batch })
        })
        .collect())
}
