use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::{addresses, batches, jars, orders};
use crate::models::jar::{Jar, JarSize};
use crate::models::order::{DeliveryStatus, NewOrder, Order, PaymentStatus};

/// Which jar to sell.
#[derive(Debug, Clone)]
pub enum JarSelection {
    /// A specific printed jar id.
    Jar(String),
    /// Any available jar of a batch (human id) and size.
    BatchSize { batch_id: String, size: JarSize },
}

#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub customer_id: Uuid,
    /// Falls back to the customer's default address.
    pub address_id: Option<Uuid>,
    pub selection: JarSelection,
    pub payment_status: PaymentStatus,
    pub amount_paise: Option<i64>,
}

impl JarSelection {
    /// From the loose checkout body fields. A jar id wins over batch + size.
    pub fn from_parts(
        jar_id: Option<&str>,
        batch_id: Option<&str>,
        size: Option<JarSize>,
    ) -> Result<Self, CheckoutError> {
        let jar_id = jar_id.map(str::trim).filter(|v| !v.is_empty());
        let batch_id = batch_id.map(str::trim).filter(|v| !v.is_empty());
        match (jar_id, batch_id, size) {
            (Some(jar_id), _, _) => Ok(Self::Jar(jar_id.to_string())),
            (None, Some(batch_id), Some(size)) => Ok(Self::BatchSize {
                batch_id: batch_id.to_string(),
                size,
            }),
            _ => Err(CheckoutError::NoSelection),
        }
    }
}

/// `ORD-<unix millis>-<6 hex chars>`.
pub fn generate_order_id() -> String {
    let mut suffix = [0u8; 3];
    OsRng.fill_bytes(&mut suffix);
    format!("ORD-{}-{}", Utc::now().timestamp_millis(), hex::encode(suffix))
}

/// Creates one order and marks its jar SOLD in a single transaction.
pub async fn place_order(pool: &PgPool, input: &CheckoutInput) -> Result<Order, CheckoutError> {
    let mut tx = pool.begin().await?;
    let order = place_order_in(&mut tx, input).await?;
    tx.commit().await?;
    Ok(order)
}

/// Same as [`place_order`] inside a caller-owned transaction, so several units
/// can be sold atomically.
pub async fn place_order_in(
    tx: &mut Transaction<'_, Postgres>,
    input: &CheckoutInput,
) -> Result<Order, CheckoutError> {
    let address = match input.address_id {
        Some(id) => addresses::get_for_customer(&mut **tx, id, input.customer_id).await?,
        None => addresses::get_default(&mut **tx, input.customer_id).await?,
    }
    .ok_or(CheckoutError::NoAddress)?;

    let jar = lock_jar(tx, &input.selection).await?;

    let order = orders::insert(
        &mut **tx,
        &NewOrder {
            order_id: generate_order_id(),
            customer_id: input.customer_id,
            jar_id: jar.id,
            batch_id: jar.batch_id,
            payment_status: input.payment_status,
            delivery_status: DeliveryStatus::Pending,
            address: address.shipping_label(),
            address_id: Some(address.id),
            amount_paise: input.amount_paise,
        },
    )
    .await?;

    jars::mark_sold(&mut **tx, jar.id, input.customer_id)
        .await?
        .ok_or(CheckoutError::JarNotAvailable)?;

    metrics::counter!("orders_created_total", "payment_status" => input.payment_status.to_string())
        .increment(1);
    tracing::info!(
        order_id = %order.order_id,
        customer_id = %order.customer_id,
        jar_id = %jar.jar_id,
        payment_status = %order.payment_status,
        "Order created"
    );

    Ok(order)
}

async fn lock_jar(
    tx: &mut Transaction<'_, Postgres>,
    selection: &JarSelection,
) -> Result<Jar, CheckoutError> {
    match selection {
        JarSelection::Jar(jar_id) => jars::lock_available_by_jar_id(tx, jar_id)
            .await?
            .ok_or(CheckoutError::JarNotAvailable),
        JarSelection::BatchSize { batch_id, size } => {
            let batch = batches::find_by_batch_id(&mut **tx, batch_id)
                .await?
                .ok_or(CheckoutError::BatchNotFound)?;
            jars::lock_available(tx, batch.id, *size)
                .await?
                .ok_or_else(|| CheckoutError::OutOfStock {
                    batch_id: batch.batch_id.clone(),
                    size: *size,
                })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("No shipping address. Add an address first.")]
    NoAddress,

    #[error("Jar not available.")]
    JarNotAvailable,

    #[error("Batch not found.")]
    BatchNotFound,

    #[error(
        "No jar available for this batch and size. Batch: {batch_id}, size: {size}. \
         Add jars for this batch and size in Admin > Jars, or run the seed binary."
    )]
    OutOfStock { batch_id: String, size: JarSize },

    #[error("Provide jarId or batchId and size.")]
    NoSelection,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CheckoutError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CheckoutError::Database(_))
    }
}
