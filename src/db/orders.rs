use std::collections::HashMap;

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::order::{NewOrder, Order, OrderDetail, OrderFilter, OrderStats, UpdateOrderRequest};

use super::{addresses, batches, customers, jars};

pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, new: &NewOrder) -> Result<Order, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders
            (order_id, customer_id, jar_id, batch_id, payment_status, delivery_status,
             address, address_id, amount_paise)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&new.order_id)
    .bind(new.customer_id)
    .bind(new.jar_id)
    .bind(new.batch_id)
    .bind(new.payment_status)
    .bind(new.delivery_status)
    .bind(&new.address)
    .bind(new.address_id)
    .bind(new.amount_paise)
    .fetch_one(executor)
    .await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool, filter: &OrderFilter) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE ($1::uuid IS NULL OR customer_id = $1)
          AND ($2::payment_status IS NULL OR payment_status = $2)
          AND ($3::delivery_status IS NULL OR delivery_status = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(filter.customer_id)
    .bind(filter.payment_status)
    .bind(filter.delivery_status)
    .fetch_all(pool)
    .await
}

pub async fn list_by_customer(pool: &PgPool, customer_id: Uuid) -> Result<Vec<Order>, sqlx::Error> {
    list(
        pool,
        &OrderFilter {
            customer_id: Some(customer_id),
            ..Default::default()
        },
    )
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateOrderRequest,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET payment_status = COALESCE($2, payment_status),
            delivery_status = COALESCE($3, delivery_status),
            address = COALESCE($4, address),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.payment_status)
    .bind(req.delivery_status)
    .bind(req.address.as_deref())
    .fetch_optional(pool)
    .await
}

pub async fn stats(pool: &PgPool) -> Result<OrderStats, sqlx::Error> {
    sqlx::query_as::<_, OrderStats>(
        r#"
        SELECT
            COUNT(*) AS total_orders,
            COUNT(*) FILTER (WHERE payment_status = 'PAID') AS paid_orders,
            COUNT(*) FILTER (WHERE payment_status = 'PENDING') AS pending_payment_orders,
            COUNT(*) FILTER (WHERE payment_status = 'REFUNDED') AS refunded_orders,
            COUNT(*) FILTER (WHERE payment_status = 'PAID' AND delivery_status = 'PENDING')
                AS pending_delivery,
            COUNT(*) FILTER (WHERE delivery_status = 'SHIPPED') AS shipped,
            COUNT(*) FILTER (WHERE delivery_status = 'DELIVERED') AS delivered,
            COALESCE(SUM(amount_paise) FILTER (WHERE payment_status = 'PAID'), 0)::BIGINT
                AS total_revenue_paise
        FROM orders
        "#,
    )
    .fetch_one(pool)
    .await
}

/// Loads related rows for a set of orders in batched queries, preserving order.
/// The customer is attached only when `with_customer` is set.
pub async fn load_details(
    pool: &PgPool,
    orders: Vec<Order>,
    with_customer: bool,
) -> Result<Vec<OrderDetail>, sqlx::Error> {
    let jar_ids: Vec<Uuid> = orders.iter().map(|o| o.jar_id).collect();
    let batch_ids: Vec<Uuid> = orders.iter().map(|o| o.batch_id).collect();
    let address_ids: Vec<Uuid> = orders.iter().filter_map(|o| o.address_id).collect();

    let jars: HashMap<_, _> = jars::get_many(pool, &jar_ids)
        .await?
        .into_iter()
        .map(|j| (j.id, j))
        .collect();
    let batches: HashMap<_, _> = batches::get_many(pool, &batch_ids)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();
    let addresses: HashMap<_, _> = addresses::get_many(pool, &address_ids)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();
    let customers: HashMap<_, _> = if with_customer {
        let ids: Vec<Uuid> = orders.iter().map(|o| o.customer_id).collect();
        customers::get_many(pool, &ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    } else {
        HashMap::new()
    };

    Ok(orders
        .into_iter()
        .map(|order| OrderDetail {
            customer: customers.get(&order.customer_id).cloned(),
            jar: jars.get(&order.jar_id).cloned(),
            batch: batches.get(&order.batch_id).cloned(),
            shipping_address: order.address_id.and_then(|id| addresses.get(&id).cloned()),
            order,
        })
        .collect())
}

pub async fn detail(pool: &PgPool, id: Uuid) -> Result<Option<OrderDetail>, sqlx::Error> {
    let Some(order) = get(pool, id).await? else {
        return Ok(None);
    };
    Ok(load_details(pool, vec![order], true).await?.into_iter().next())
}
