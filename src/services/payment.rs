use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::PAYMENT_SESSION_EXPIRY_MINUTES;
use crate::db::{addresses, payment_sessions};
use crate::models::order::{Order, PaymentStatus};
use crate::models::payment::{
    CartItem, CreatePaymentOrderRequest, CreatePaymentOrderResponse, PaymentSession,
};
use crate::services::checkout::{self, CheckoutError, CheckoutInput, JarSelection};
use crate::services::razorpay::{self, RazorpayClient, RazorpayError};

/// Smallest payable amount (₹1).
pub const MIN_AMOUNT_PAISE: i64 = 100;

/// Most jars a single cart may order.
pub const MAX_CART_UNITS: usize = 50;

/// A validated create-order body.
#[derive(Debug, Clone)]
pub struct CartCheckout {
    pub address_id: Uuid,
    pub batch_id: String,
    pub amount_paise: i64,
    pub items: Vec<CartItem>,
}

impl TryFrom<CreatePaymentOrderRequest> for CartCheckout {
    type Error = PaymentError;

    fn try_from(req: CreatePaymentOrderRequest) -> Result<Self, Self::Error> {
        let batch_id = req
            .batch_id
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        let (Some(address_id), Some(batch_id), Some(amount_paise), Some(items)) =
            (req.address_id, batch_id, req.amount_paise, req.items)
        else {
            return Err(PaymentError::MissingFields);
        };
        if amount_paise < MIN_AMOUNT_PAISE {
            return Err(PaymentError::AmountTooSmall);
        }
        check_units(&items)?;
        Ok(Self {
            address_id,
            batch_id,
            amount_paise,
            items,
        })
    }
}

/// Total jars across all cart lines.
pub fn unit_count(items: &[CartItem]) -> u64 {
    items.iter().map(|i| u64::from(i.quantity)).sum()
}

/// Every line orders at least one jar and the cart holds at most [`MAX_CART_UNITS`].
pub fn check_units(items: &[CartItem]) -> Result<usize, PaymentError> {
    if items.is_empty() {
        return Err(PaymentError::EmptyCart);
    }
    if items.iter().any(|i| i.quantity == 0) {
        return Err(PaymentError::InvalidQuantity);
    }
    let units = unit_count(items);
    if units > MAX_CART_UNITS as u64 {
        return Err(PaymentError::TooManyUnits);
    }
    Ok(units as usize)
}

/// Splits `total` paise across `units` orders. The remainder goes to the first unit
/// so the parts always sum to `total`.
pub fn split_amount(total: i64, units: usize) -> impl Iterator<Item = i64> {
    let n = units.max(1) as i64;
    let base = total / n;
    let remainder = total - base * n;
    (0..units).map(move |idx| if idx == 0 { base + remainder } else { base })
}

/// Expires stale sessions, creates the Razorpay order and stores a PENDING session.
pub async fn create_payment_order(
    pool: &PgPool,
    razorpay: &RazorpayClient,
    customer_id: Uuid,
    cart: &CartCheckout,
) -> Result<CreatePaymentOrderResponse, PaymentError> {
    ensure_address(pool, customer_id, cart.address_id).await?;

    let expired = expire_stale_sessions(pool).await?;
    if expired > 0 {
        tracing::info!(expired, "Expired stale payment sessions");
    }

    let receipt = format!("amrytum-{}", Utc::now().timestamp_millis());
    let order = razorpay.create_order(cart.amount_paise, &receipt).await?;

    payment_sessions::create(
        pool,
        &order.id,
        customer_id,
        cart.address_id,
        &cart.batch_id,
        cart.amount_paise,
        &cart.items,
    )
    .await?;

    tracing::info!(
        razorpay_order_id = %order.id,
        customer_id = %customer_id,
        amount_paise = cart.amount_paise,
        "Payment session created"
    );

    Ok(CreatePaymentOrderResponse {
        razorpay_order_id: order.id,
        key_id: razorpay.key_id().to_string(),
        amount: order.amount,
        currency: order.currency,
    })
}

/// Cash on delivery: creates every unit's order right away with payment PENDING.
pub async fn create_cod_orders(
    pool: &PgPool,
    customer_id: Uuid,
    cart: &CartCheckout,
) -> Result<Vec<Order>, PaymentError> {
    ensure_address(pool, customer_id, cart.address_id).await?;
    create_orders(
        pool,
        customer_id,
        cart.address_id,
        &cart.batch_id,
        &cart.items,
        cart.amount_paise,
        PaymentStatus::Pending,
    )
    .await
}

/// Client callback after checkout: verifies the signature, then fulfills.
pub async fn verify_and_fulfill(
    pool: &PgPool,
    razorpay: Option<&RazorpayClient>,
    razorpay_order_id: &str,
    razorpay_payment_id: &str,
    signature: &str,
) -> Result<Vec<Order>, PaymentError> {
    let secret = razorpay.map(|r| r.key_secret()).unwrap_or_default();
    if !razorpay::verify_payment_signature(secret, razorpay_order_id, razorpay_payment_id, signature)
    {
        return Err(PaymentError::InvalidSignature);
    }
    let razorpay = razorpay.ok_or(PaymentError::NotConfigured)?;
    fulfill_session(pool, razorpay, razorpay_order_id, razorpay_payment_id).await
}

/// Creates PAID orders for a PENDING session once Razorpay reports the payment captured.
///
/// All orders and the COMPLETED transition commit together. A session that is no
/// longer PENDING yields `SessionNotFound`, which makes webhook redelivery harmless.
pub async fn fulfill_session(
    pool: &PgPool,
    razorpay: &RazorpayClient,
    razorpay_order_id: &str,
    razorpay_payment_id: &str,
) -> Result<Vec<Order>, PaymentError> {
    payment_sessions::find_pending(pool, razorpay_order_id)
        .await?
        .ok_or(PaymentError::SessionNotFound)?;

    let payment = razorpay.fetch_payment(razorpay_payment_id).await?;
    if !payment.is_captured() {
        return Err(PaymentError::NotCaptured);
    }

    let mut tx = pool.begin().await?;
    let session = payment_sessions::lock_pending(&mut tx, razorpay_order_id)
        .await?
        .ok_or(PaymentError::SessionNotFound)?;

    let orders = create_session_orders(&mut tx, &session).await?;
    payment_sessions::mark_completed(&mut tx, session.id).await?;
    tx.commit().await?;

    tracing::info!(
        razorpay_order_id = %razorpay_order_id,
        razorpay_payment_id = %razorpay_payment_id,
        orders = orders.len(),
        "Payment session fulfilled"
    );
    Ok(orders)
}

/// Marks PENDING sessions older than the expiry window EXPIRED.
pub async fn expire_stale_sessions(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - Duration::minutes(PAYMENT_SESSION_EXPIRY_MINUTES);
    payment_sessions::expire_stale(pool, cutoff).await
}

async fn ensure_address(
    pool: &PgPool,
    customer_id: Uuid,
    address_id: Uuid,
) -> Result<(), PaymentError> {
    addresses::get_for_customer(pool, address_id, customer_id)
        .await?
        .map(|_| ())
        .ok_or(PaymentError::AddressNotFound)
}

async fn create_session_orders(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    session: &PaymentSession,
) -> Result<Vec<Order>, PaymentError> {
    create_orders_in(
        tx,
        session.customer_id,
        session.address_id,
        &session.batch_id,
        &session.items,
        session.amount_paise,
        PaymentStatus::Paid,
    )
    .await
}

async fn create_orders(
    pool: &PgPool,
    customer_id: Uuid,
    address_id: Uuid,
    batch_id: &str,
    items: &[CartItem],
    amount_paise: i64,
    payment_status: PaymentStatus,
) -> Result<Vec<Order>, PaymentError> {
    let mut tx = pool.begin().await?;
    let orders = create_orders_in(
        &mut tx,
        customer_id,
        address_id,
        batch_id,
        items,
        amount_paise,
        payment_status,
    )
    .await?;
    tx.commit().await?;
    Ok(orders)
}

async fn create_orders_in(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    customer_id: Uuid,
    address_id: Uuid,
    batch_id: &str,
    items: &[CartItem],
    amount_paise: i64,
    payment_status: PaymentStatus,
) -> Result<Vec<Order>, PaymentError> {
    // Sessions stored before a cart was rejected still pass through here.
    let amounts = split_amount(amount_paise, check_units(items)?);
    let units = items
        .iter()
        .flat_map(|item| std::iter::repeat(item.size).take(item.quantity as usize));

    let mut orders = Vec::new();
    for (size, amount) in units.zip(amounts) {
        let input = CheckoutInput {
            customer_id,
            address_id: Some(address_id),
            selection: JarSelection::BatchSize {
                batch_id: batch_id.to_string(),
                size,
            },
            payment_status,
            amount_paise: Some(amount),
        };
        orders.push(checkout::place_order_in(tx, &input).await?);
    }
    Ok(orders)
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Razorpay is not configured. Set RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET.")]
    NotConfigured,

    #[error("Missing required: address_id, batch_id, amount_paise, items")]
    MissingFields,

    #[error("Amount must be at least ₹1 (100 paise).")]
    AmountTooSmall,

    #[error("Cart is empty.")]
    EmptyCart,

    #[error("Each item needs a quantity of at least 1.")]
    InvalidQuantity,

    #[error("Too many jars in one order (max 50).")]
    TooManyUnits,

    #[error("Address not found.")]
    AddressNotFound,

    #[error("Invalid payment signature.")]
    InvalidSignature,

    #[error("Payment session not found or already completed.")]
    SessionNotFound,

    #[error("Payment not captured.")]
    NotCaptured,

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Gateway(#[from] RazorpayError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PaymentError {
    pub fn is_client_error(&self) -> bool {
        match self {
            PaymentError::Checkout(e) => e.is_client_error(),
            PaymentError::Gateway(_) | PaymentError::Database(_) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::jar::JarSize;

    fn request(amount: Option<i64>, items: Option<Vec<CartItem>>) -> CreatePaymentOrderRequest {
        CreatePaymentOrderRequest {
            address_id: Some(Uuid::new_v4()),
            batch_id: Some(" AMR-001 ".to_string()),
            amount_paise: amount,
            items,
        }
    }

    #[test]
    fn test_split_amount_sums_to_total() {
        assert_eq!(split_amount(1000, 3).collect::<Vec<_>>(), vec![334, 333, 333]);
        assert_eq!(split_amount(899, 1).collect::<Vec<_>>(), vec![899]);
        assert_eq!(split_amount(300, 3).collect::<Vec<_>>(), vec![100, 100, 100]);
        assert_eq!(split_amount(500, 0).count(), 0);

        assert_eq!(split_amount(123_457, 7).sum::<i64>(), 123_457);
    }

    #[test]
    fn test_unit_count() {
        let items = vec![
            CartItem {
                size: JarSize::Size250Ml,
                quantity: 2,
            },
            CartItem {
                size: JarSize::Size1L,
                quantity: 1,
            },
        ];
        assert_eq!(unit_count(&items), 3);
    }

    #[test]
    fn test_cart_validation() {
        let items = vec![CartItem {
            size: JarSize::Size500Ml,
            quantity: 1,
        }];

        let cart = CartCheckout::try_from(request(Some(89_900), Some(items.clone()))).unwrap();
        assert_eq!(cart.batch_id, "AMR-001");

        let err = CartCheckout::try_from(request(Some(99), Some(items.clone()))).unwrap_err();
        assert!(matches!(err, PaymentError::AmountTooSmall));

        let err = CartCheckout::try_from(request(None, Some(items))).unwrap_err();
        assert!(matches!(err, PaymentError::MissingFields));

        let err = CartCheckout::try_from(request(Some(500), Some(vec![]))).unwrap_err();
        assert!(matches!(err, PaymentError::EmptyCart));
    }

    #[test]
    fn test_cart_unit_cap() {
        let line = |quantity| CartItem {
            size: JarSize::Size1L,
            quantity,
        };

        let err = CartCheckout::try_from(request(Some(500), Some(vec![line(u32::MAX)])))
            .unwrap_err();
        assert!(matches!(err, PaymentError::TooManyUnits));
        assert!(err.is_client_error());

        // Lines that each fit but together exceed the cap
        let err = CartCheckout::try_from(request(
            Some(500),
            Some(vec![line(u32::MAX), line(u32::MAX)]),
        ))
        .unwrap_err();
        assert!(matches!(err, PaymentError::TooManyUnits));

        let err =
            CartCheckout::try_from(request(Some(500), Some(vec![line(1), line(0)]))).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidQuantity));

        let at_cap = vec![line(MAX_CART_UNITS as u32)];
        assert_eq!(check_units(&at_cap).unwrap(), MAX_CART_UNITS);
        let over = vec![line(MAX_CART_UNITS as u32), line(1)];
        assert!(matches!(check_units(&over), Err(PaymentError::TooManyUnits)));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(PaymentError::InvalidSignature.is_client_error());
        assert!(PaymentError::Checkout(CheckoutError::BatchNotFound).is_client_error());
        assert!(!PaymentError::Database(sqlx::Error::PoolClosed).is_client_error());
        assert!(!PaymentError::Gateway(RazorpayError::Api {
            status: 502,
            body: String::new()
        })
        .is_client_error());
    }
}
