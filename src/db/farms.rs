use sqlx::PgPool;
use uuid::Uuid;

use crate::models::farm::Farm;

pub async fn create(
    pool: &PgPool,
    name: &str,
    location: Option<&str>,
    notes: Option<&str>,
) -> Result<Farm, sqlx::Error> {
    sqlx::query_as::<_, Farm>(
        "INSERT INTO farms (name, location, notes) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(name)
    .bind(location)
    .bind(notes)
    .fetch_one(pool)
    .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Farm>, sqlx::Error> {
    sqlx::query_as::<_, Farm>("SELECT * FROM farms ORDER BY name ASC")
        .fetch_all(pool)
        .await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Farm>, sqlx::Error> {
    sqlx::query_as::<_, Farm>("SELECT * FROM farms WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Farm>, sqlx::Error> {
    sqlx::query_as::<_, Farm>("SELECT * FROM farms WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}

pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Farm>, sqlx::Error> {
    sqlx::query_as::<_, Farm>("SELECT * FROM farms WHERE name = $1 ORDER BY created_at LIMIT 1")
        .bind(name)
        .fetch_optional(pool)
        .await
}
