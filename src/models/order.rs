use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::{address::Address, batch::Batch, customer::Customer, jar::Jar, jar::JarSize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "delivery_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Shipped,
    Delivered,
}

/// One order is one jar. `address` is a text snapshot taken at checkout.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_id: String,
    pub customer_id: Uuid,
    pub jar_id: Uuid,
    pub batch_id: Uuid,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub address: String,
    pub address_id: Option<Uuid>,
    pub amount_paise: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order with its related rows. `customer` is omitted on the customer's own listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    pub jar: Option<Jar>,
    pub batch: Option<Batch>,
    pub shipping_address: Option<Address>,
}

/// Fields for inserting an order row.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: String,
    pub customer_id: Uuid,
    pub jar_id: Uuid,
    pub batch_id: Uuid,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub address: String,
    pub address_id: Option<Uuid>,
    pub amount_paise: Option<i64>,
}

/// Customer checkout body. Either `jar_id`, or `batch_id` + `size`.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    pub address_id: Option<Uuid>,
    pub jar_id: Option<String>,
    pub batch_id: Option<String>,
    pub size: Option<JarSize>,
}

/// Admin manual order entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order_id: Option<String>,
    pub customer_id: Option<Uuid>,
    pub jar_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub payment_status: Option<PaymentStatus>,
    pub delivery_status: Option<DeliveryStatus>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub payment_status: Option<PaymentStatus>,
    pub delivery_status: Option<DeliveryStatus>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub customer_id: Option<Uuid>,
    pub payment_status: Option<PaymentStatus>,
    pub delivery_status: Option<DeliveryStatus>,
}

/// Admin dashboard aggregates.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: i64,
    pub paid_orders: i64,
    pub pending_payment_orders: i64,
    pub refunded_orders: i64,
    /// Paid but not yet shipped.
    pub pending_delivery: i64,
    pub shipped: i64,
    pub delivered: i64,
    pub total_revenue_paise: i64,
}

/// `{orders}` body returned by the payment endpoints.
#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}
