use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::site::{Brand, Founder, ProcessStep, SiteContent};

#[derive(sqlx::FromRow)]
struct SiteRow {
    brand: Json<Brand>,
    process_steps: Json<Vec<ProcessStep>>,
    founder: Json<Founder>,
}

impl From<SiteRow> for SiteContent {
    fn from(row: SiteRow) -> Self {
        Self {
            brand: row.brand.0,
            process_steps: row.process_steps.0,
            founder: row.founder.0,
        }
    }
}

/// The stored site content, or `None` when nothing has been saved yet.
pub async fn get(pool: &PgPool) -> Result<Option<SiteContent>, sqlx::Error> {
    let row = sqlx::query_as::<_, SiteRow>(
        "SELECT brand, process_steps, founder FROM site_content ORDER BY updated_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.map(SiteContent::from))
}

/// Overwrites the single content row, creating it if needed.
pub async fn save(pool: &PgPool, content: &SiteContent) -> Result<SiteContent, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, SiteRow>(
        r#"
        UPDATE site_content
        SET brand = $1, process_steps = $2, founder = $3, updated_at = NOW()
        RETURNING brand, process_steps, founder
        "#,
    )
    .bind(Json(&content.brand))
    .bind(Json(&content.process_steps))
    .bind(Json(&content.founder))
    .fetch_optional(&mut *tx)
    .await?;

    let row = match updated {
        Some(row) => row,
        None => {
            sqlx::query_as::<_, SiteRow>(
                r#"
                INSERT INTO site_content (brand, process_steps, founder)
                VALUES ($1, $2, $3)
                RETURNING brand, process_steps, founder
                "#,
            )
            .bind(Json(&content.brand))
            .bind(Json(&content.process_steps))
            .bind(Json(&content.founder))
            .fetch_one(&mut *tx)
            .await?
        }
    };

    tx.commit().await?;
    Ok(row.into())
}
