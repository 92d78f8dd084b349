use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::catalog::{CatalogProduct, ProductSize, UpdateProductRequest};

pub async fn list(pool: &PgPool) -> Result<Vec<CatalogProduct>, sqlx::Error> {
    sqlx::query_as::<_, CatalogProduct>(
        "SELECT * FROM catalog_products ORDER BY sort_order ASC, created_at ASC",
    )
    .fetch_all(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    product_id: &str,
    name: &str,
    description: &str,
    sizes: &[ProductSize],
    default_size_id: &str,
    sort_order: i32,
) -> Result<CatalogProduct, sqlx::Error> {
    sqlx::query_as::<_, CatalogProduct>(
        r#"
        INSERT INTO catalog_products
            (product_id, name, description, sizes, default_size_id, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(name)
    .bind(description)
    .bind(Json(sizes))
    .bind(default_size_id)
    .bind(sort_order)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateProductRequest,
) -> Result<Option<CatalogProduct>, sqlx::Error> {
    sqlx::query_as::<_, CatalogProduct>(
        r#"
        UPDATE catalog_products
        SET product_id = COALESCE($2, product_id),
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            sizes = COALESCE($5, sizes),
            default_size_id = COALESCE($6, default_size_id),
            sort_order = COALESCE($7, sort_order),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.product_id.as_deref().map(str::trim))
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.description.as_deref().map(str::trim))
    .bind(req.sizes.as_ref().map(Json))
    .bind(req.default_size_id.as_deref())
    .bind(req.sort_order)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM catalog_products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn exists(pool: &PgPool, product_id: &str) -> Result<bool, sqlx::Error> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM catalog_products WHERE product_id = $1)")
            .bind(product_id)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}
