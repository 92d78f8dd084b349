//! Idempotent development data: a farm, an approved batch with stock, site copy
//! and the default catalog.

use amrytum_backend::{
    config::AppConfig,
    db::{self, batches, catalog, farms, jars, site},
    models::batch::{BatchStatus, NewBatch},
    models::catalog::ProductSize,
    models::jar::JarSize,
    models::site::SiteContent,
};
use chrono::Utc;
use sqlx::PgPool;
use strum::IntoEnumIterator;
use tracing_subscriber::EnvFilter;

const SEED_FARM: &str = "Seed Farm";
const SEED_BATCH: &str = "AMR-001";
const JARS_PER_SIZE: i64 = 5;

struct SeedProduct {
    product_id: &'static str,
    name: &'static str,
    description: &'static str,
    sizes: &'static [(&'static str, &'static str, i64, &'static str)],
    default_size_id: &'static str,
}

const PRODUCTS: [SeedProduct; 3] = [
    SeedProduct {
        product_id: "a2-ghee",
        name: "A2 Desi Cow Ghee",
        description: "Small batch, bilona method. Lab-tested. Glass jar.",
        sizes: &[
            ("250ml", "250 ml", 899, "₹899"),
            ("500ml", "500 ml", 1699, "₹1,699"),
            ("1L", "1 L", 3199, "₹3,199"),
        ],
        default_size_id: "500ml",
    },
    SeedProduct {
        product_id: "wild-honey",
        name: "Wild Forest Honey",
        description: "Single-origin, raw, unfiltered. From ethical beekeepers.",
        sizes: &[("250g", "250 g", 749, "₹749"), ("500g", "500 g", 1399, "₹1,399")],
        default_size_id: "500g",
    },
    SeedProduct {
        product_id: "cold-pressed-oil",
        name: "Cold-Pressed Mustard Oil",
        description: "Wood-pressed, single estate. No refining.",
        sizes: &[("500ml", "500 ml", 599, "₹599"), ("1L", "1 L", 1099, "₹1,099")],
        default_size_id: "500ml",
    },
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    if let Err(e) = seed(&pool).await {
        tracing::error!(error = %e, "Seeding failed");
        std::process::exit(1);
    }
    tracing::info!("Seed complete");
}

async fn seed(pool: &PgPool) -> Result<(), sqlx::Error> {
    let farm = match farms::find_by_name(pool, SEED_FARM).await? {
        Some(farm) => farm,
        None => {
            let farm =
                farms::create(pool, SEED_FARM, Some("Sample location"), Some("For local dev"))
                    .await?;
            tracing::info!("Created seed farm");
            farm
        }
    };

    let batch = match batches::find_by_batch_id(pool, SEED_BATCH).await? {
        Some(batch) => batch,
        None => {
            let batch = batches::create(
                pool,
                &NewBatch {
                    batch_id: SEED_BATCH.to_string(),
                    farm_id: farm.id,
                    date: Utc::now(),
                    cows_count: 4,
                    milk_liters: 80.0,
                    ghee_output_liters: 12.0,
                    processing_notes: Some("Seed batch for local dev".to_string()),
                },
            )
            .await?;
            tracing::info!(batch_id = SEED_BATCH, "Created seed batch");
            batch
        }
    };
    if batch.status != BatchStatus::Approved {
        batches::set_status(pool, batch.id, BatchStatus::Approved).await?;
        tracing::info!(batch_id = SEED_BATCH, "Approved seed batch");
    }

    for size in JarSize::iter() {
        let available = jars::count_available(pool, batch.id, size).await?;
        let missing = (JARS_PER_SIZE - available).max(0) as usize;
        if missing > 0 {
            jars::create_many(pool, batch.id, size, missing).await?;
            tracing::info!(batch_id = SEED_BATCH, size = %size, added = missing, "Added seed jars");
        }
    }

    if site::get(pool).await?.is_none() {
        site::save(pool, &SiteContent::default()).await?;
        tracing::info!("Created default site content");
    }

    if catalog::list(pool).await?.is_empty() {
        for (sort_order, product) in PRODUCTS.iter().enumerate() {
            let sizes: Vec<ProductSize> = product
                .sizes
                .iter()
                .map(|(id, label, price, inr)| ProductSize {
                    id: id.to_string(),
                    label: label.to_string(),
                    price: *price,
                    inr: inr.to_string(),
                })
                .collect();
            catalog::create(
                pool,
                product.product_id,
                product.name,
                product.description,
                &sizes,
                product.default_size_id,
                sort_order as i32,
            )
            .await?;
        }
        tracing::info!(count = PRODUCTS.len(), "Created default catalog products");
    }

    Ok(())
}
