use amrytum_backend::{
    config::{AppConfig, RazorpayConfig},
    db::{self, addresses, admins, batches, customers, farms, jars, orders, otps, payment_sessions},
    models::address::NewAddress,
    models::batch::{BatchStatus, NewBatch},
    models::jar::{JarSize, JarStatus},
    models::order::PaymentStatus,
    models::payment::CartItem,
    services::{
        auth::TokenService,
        checkout::{self, CheckoutError, CheckoutInput, JarSelection},
        payment::{self, CartCheckout, PaymentError},
        rate_limit::{Limit, RateLimiter},
        razorpay::{self, RazorpayClient},
        storage::{self, Storage},
    },
};
use amrytum_backend::error::map_constraint;
use amrytum_backend::routes::addresses::ADDRESS_IN_USE;
use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> PgPool {
    let config = AppConfig::from_env().expect("Failed to load config");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

fn unique_batch_id() -> String {
    format!("IT-{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase()
}

fn unique_phone() -> String {
    let n = Uuid::new_v4().as_u128() % 10_000_000_000;
    format!("{:010}", n)
}

/// An approved batch with `jars_per_size` AVAILABLE jars of each size.
async fn stocked_batch(pool: &PgPool, jars_per_size: usize) -> amrytum_backend::models::batch::Batch {
    let farm = farms::create(pool, "Integration Farm", Some("Test"), None)
        .await
        .expect("Failed to create farm");
    let batch = batches::create(
        pool,
        &NewBatch {
            batch_id: unique_batch_id(),
            farm_id: farm.id,
            date: Utc::now(),
            cows_count: 3,
            milk_liters: 60.0,
            ghee_output_liters: 9.0,
            processing_notes: None,
        },
    )
    .await
    .expect("Failed to create batch");
    assert_eq!(batch.status, BatchStatus::Pending);

    let batch = batches::set_status(pool, batch.id, BatchStatus::Approved)
        .await
        .expect("Failed to approve batch")
        .expect("Batch not found");

    for size in [JarSize::Size250Ml, JarSize::Size500Ml, JarSize::Size1L] {
        jars::create_many(pool, batch.id, size, jars_per_size)
            .await
            .expect("Failed to create jars");
    }
    batch
}

async fn customer_with_address(pool: &PgPool) -> (Uuid, Uuid) {
    let customer = customers::find_or_create_by_phone(pool, &unique_phone())
        .await
        .expect("Failed to create customer");
    let address = addresses::create(
        pool,
        customer.id,
        &NewAddress {
            name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            address_line1: "12 MG Road".to_string(),
            address_line2: None,
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            is_default: true,
        },
    )
    .await
    .expect("Failed to create address");
    (customer.id, address.id)
}

/// Checkout by batch + size, then by explicit jar id, then out of stock.
///
/// Requires a PostgreSQL instance configured via DATABASE_URL.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_checkout_flow() {
    let pool = test_pool().await;
    let batch = stocked_batch(&pool, 1).await;
    let (customer_id, address_id) = customer_with_address(&pool).await;

    // 1. Any jar of the batch and size, default address
    let order = checkout::place_order(
        &pool,
        &CheckoutInput {
            customer_id,
            address_id: None,
            selection: JarSelection::BatchSize {
                batch_id: batch.batch_id.to_lowercase(),
                size: JarSize::Size1L,
            },
            payment_status: PaymentStatus::Pending,
            amount_paise: None,
        },
    )
    .await
    .expect("Checkout failed");

    assert!(order.order_id.starts_with("ORD-"));
    assert_eq!(order.batch_id, batch.id);
    assert_eq!(order.address_id, Some(address_id));
    assert!(order.address.starts_with("Asha Rao, 9876543210\n12 MG Road\n"));
    assert!(order.address.ends_with("Pune, Maharashtra - 411001"));

    let jar = jars::get(&pool, order.jar_id)
        .await
        .expect("Failed to load jar")
        .expect("Jar not found");
    assert_eq!(jar.status, JarStatus::Sold);
    assert_eq!(jar.customer_id, Some(customer_id));

    // 2. The sold jar cannot be bought again
    let err = checkout::place_order(
        &pool,
        &CheckoutInput {
            customer_id,
            address_id: Some(address_id),
            selection: JarSelection::Jar(jar.jar_id.clone()),
            payment_status: PaymentStatus::Pending,
            amount_paise: None,
        },
    )
    .await
    .expect_err("Sold jar was sold twice");
    assert!(matches!(err, CheckoutError::JarNotAvailable));

    // 3. The only 1 L jar is gone
    let err = checkout::place_order(
        &pool,
        &CheckoutInput {
            customer_id,
            address_id: None,
            selection: JarSelection::BatchSize {
                batch_id: batch.batch_id.clone(),
                size: JarSize::Size1L,
            },
            payment_status: PaymentStatus::Pending,
            amount_paise: None,
        },
    )
    .await
    .expect_err("Out of stock batch accepted an order");
    assert!(matches!(err, CheckoutError::OutOfStock { .. }));

    let stock = jars::availability(&pool, batch.id)
        .await
        .expect("Failed to load availability");
    assert_eq!(stock.size_1l, 0);
    assert_eq!(stock.size_500ml, 1);

    let details = orders::load_details(&pool, vec![order], true)
        .await
        .expect("Failed to load order details");
    assert!(details[0].customer.is_some());
    assert!(details[0].jar.is_some());
    assert!(details[0].shipping_address.is_some());
}

/// Concurrent checkouts for the last jar of a size: exactly one wins.
#[tokio::test]
#[ignore]
async fn test_concurrent_checkout_sells_each_jar_once() {
    let pool = test_pool().await;
    let batch = stocked_batch(&pool, 1).await;

    let mut customers = Vec::new();
    for _ in 0..4 {
        customers.push(customer_with_address(&pool).await.0);
    }

    let tasks = customers.into_iter().map(|customer_id| {
        let pool = pool.clone();
        let batch_id = batch.batch_id.clone();
        tokio::spawn(async move {
            checkout::place_order(
                &pool,
                &CheckoutInput {
                    customer_id,
                    address_id: None,
                    selection: JarSelection::BatchSize {
                        batch_id,
                        size: JarSize::Size500Ml,
                    },
                    payment_status: PaymentStatus::Pending,
                    amount_paise: None,
                },
            )
            .await
        })
    });
    let results = futures::future::join_all(tasks).await;

    let mut sold = 0;
    for result in results {
        match result.expect("Checkout task panicked") {
            Ok(_) => sold += 1,
            Err(e) => assert!(
                matches!(e, CheckoutError::OutOfStock { .. }),
                "Unexpected checkout error: {e}"
            ),
        }
    }
    assert_eq!(sold, 1);

    let stock = jars::availability(&pool, batch.id)
        .await
        .expect("Failed to load availability");
    assert_eq!(stock.size_500ml, 0);
}

/// A checkout that fails part way leaves no orders and no sold jars behind.
#[tokio::test]
#[ignore]
async fn test_cod_orders_are_atomic_and_split_amount() {
    let pool = test_pool().await;
    let batch = stocked_batch(&pool, 2).await;
    let (customer_id, address_id) = customer_with_address(&pool).await;

    let cart = CartCheckout {
        address_id,
        batch_id: batch.batch_id.clone(),
        amount_paise: 1000,
        items: vec![
            CartItem {
                size: JarSize::Size250Ml,
                quantity: 2,
            },
            CartItem {
                size: JarSize::Size500Ml,
                quantity: 1,
            },
        ],
    };
    let created = payment::create_cod_orders(&pool, customer_id, &cart)
        .await
        .expect("COD checkout failed");
    assert_eq!(created.len(), 3);
    let amounts: Vec<i64> = created.iter().filter_map(|o| o.amount_paise).collect();
    assert_eq!(amounts, vec![334, 333, 333]);
    assert!(created.iter().all(|o| o.payment_status == PaymentStatus::Pending));

    // Only one 500 ml jar is left; asking for two must roll back the 250 ml unit too
    let before = jars::availability(&pool, batch.id).await.expect("availability");
    let greedy = CartCheckout {
        items: vec![
            CartItem {
                size: JarSize::Size1L,
                quantity: 1,
            },
            CartItem {
                size: JarSize::Size500Ml,
                quantity: 2,
            },
        ],
        ..cart
    };
    let err = payment::create_cod_orders(&pool, customer_id, &greedy)
        .await
        .expect_err("Oversized cart succeeded");
    assert!(matches!(
        err,
        PaymentError::Checkout(CheckoutError::OutOfStock { .. })
    ));
    let after = jars::availability(&pool, batch.id).await.expect("availability");
    assert_eq!(before, after);
}

#[tokio::test]
#[ignore]
async fn test_payment_session_lifecycle() {
    let pool = test_pool().await;
    let batch = stocked_batch(&pool, 1).await;
    let (customer_id, address_id) = customer_with_address(&pool).await;
    let razorpay_order_id = format!("order_it_{}", Uuid::new_v4().simple());

    let session = payment_sessions::create(
        &pool,
        &razorpay_order_id,
        customer_id,
        address_id,
        &batch.batch_id,
        89900,
        &[CartItem {
            size: JarSize::Size250Ml,
            quantity: 1,
        }],
    )
    .await
    .expect("Failed to create session");

    let pending = payment_sessions::find_pending(&pool, &razorpay_order_id)
        .await
        .expect("Failed to find session")
        .expect("Session not pending");
    assert_eq!(pending.id, session.id);
    assert_eq!(pending.items.0.len(), 1);

    // A cutoff in the future expires everything still pending, this session included
    let expired = payment_sessions::expire_stale(&pool, Utc::now() + Duration::minutes(1))
        .await
        .expect("Failed to expire sessions");
    assert!(expired >= 1);

    let gone = payment_sessions::find_pending(&pool, &razorpay_order_id)
        .await
        .expect("Failed to find session");
    assert!(gone.is_none());
}

/// Serves `GET /payments/{id}` like Razorpay. Ids containing "authorized" are not captured.
async fn stub_gateway() -> String {
    async fn payment(Path(id): Path<String>) -> Json<serde_json::Value> {
        let status = if id.contains("authorized") {
            "authorized"
        } else {
            "captured"
        };
        Json(serde_json::json!({ "id": id, "status": status }))
    }

    let app = Router::new().route("/payments/{id}", get(payment));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub gateway");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

/// Verify creates PAID orders for the session in one go; redelivery and
/// stock shortfalls leave no partial state.
#[tokio::test]
#[ignore]
async fn test_paid_session_fulfillment() {
    let pool = test_pool().await;
    let batch = stocked_batch(&pool, 2).await;
    let (customer_id, address_id) = customer_with_address(&pool).await;

    let config = RazorpayConfig {
        key_id: "rzp_test_key".to_string(),
        key_secret: "rzp_test_secret".to_string(),
    };
    let razorpay = RazorpayClient::with_base_url(&config, &stub_gateway().await);

    let order_id = format!("order_it_{}", Uuid::new_v4().simple());
    payment_sessions::create(
        &pool,
        &order_id,
        customer_id,
        address_id,
        &batch.batch_id,
        1000,
        &[
            CartItem {
                size: JarSize::Size250Ml,
                quantity: 2,
            },
            CartItem {
                size: JarSize::Size500Ml,
                quantity: 1,
            },
        ],
    )
    .await
    .expect("Failed to create session");

    // Wrong signature never reaches the gateway
    let err = payment::verify_and_fulfill(&pool, Some(&razorpay), &order_id, "pay_1", "00")
        .await
        .expect_err("Bad signature accepted");
    assert!(matches!(err, PaymentError::InvalidSignature));

    // Authorized but not captured
    let err = payment::fulfill_session(&pool, &razorpay, &order_id, "pay_authorized")
        .await
        .expect_err("Uncaptured payment fulfilled");
    assert!(matches!(err, PaymentError::NotCaptured));

    let signature = razorpay::sign(&config.key_secret, format!("{order_id}|pay_1").as_bytes())
        .expect("Failed to sign");
    let orders = payment::verify_and_fulfill(&pool, Some(&razorpay), &order_id, "pay_1", &signature)
        .await
        .expect("Fulfillment failed");
    assert_eq!(orders.len(), 3);
    let amounts: Vec<i64> = orders.iter().filter_map(|o| o.amount_paise).collect();
    assert_eq!(amounts, vec![334, 333, 333]);
    assert!(orders.iter().all(|o| o.payment_status == PaymentStatus::Paid));
    assert!(payment_sessions::find_pending(&pool, &order_id)
        .await
        .expect("Failed to find session")
        .is_none());

    // Webhook redelivery for the same order
    let err = payment::fulfill_session(&pool, &razorpay, &order_id, "pay_1")
        .await
        .expect_err("Session fulfilled twice");
    assert!(matches!(err, PaymentError::SessionNotFound));

    // Only one 500 ml jar is left; the whole session rolls back
    let short_id = format!("order_it_{}", Uuid::new_v4().simple());
    payment_sessions::create(
        &pool,
        &short_id,
        customer_id,
        address_id,
        &batch.batch_id,
        5000,
        &[
            CartItem {
                size: JarSize::Size1L,
                quantity: 1,
            },
            CartItem {
                size: JarSize::Size500Ml,
                quantity: 2,
            },
        ],
    )
    .await
    .expect("Failed to create session");

    let err = payment::fulfill_session(&pool, &razorpay, &short_id, "pay_2")
        .await
        .expect_err("Short stock fulfilled");
    assert!(matches!(
        err,
        PaymentError::Checkout(CheckoutError::OutOfStock { .. })
    ));
    assert!(payment_sessions::find_pending(&pool, &short_id)
        .await
        .expect("Failed to find session")
        .is_some());
    let stock = jars::availability(&pool, batch.id).await.expect("availability");
    assert_eq!(stock.size_1l, 2);
    assert_eq!(stock.size_500ml, 1);
}

/// Requires Redis configured via REDIS_URL.
#[tokio::test]
#[ignore]
async fn test_rate_limit_window() {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL not set");
    let limiter = RateLimiter::new(Some(&url)).expect("Failed to create limiter");
    let limit = Limit {
        bucket: "integration",
        max: 2,
        window: std::time::Duration::from_secs(60),
    };
    let client = format!("client-{}", Uuid::new_v4().simple());

    assert!(limiter.check(&limit, &client).await);
    assert!(limiter.check(&limit, &client).await);
    assert!(!limiter.check(&limit, &client).await);

    // Other clients have their own window
    let other = format!("other-{}", Uuid::new_v4().simple());
    assert!(limiter.check(&limit, &other).await);

    // No Redis: everything passes
    let disabled = RateLimiter::disabled();
    for _ in 0..5 {
        assert!(disabled.check(&limit, &client).await);
    }
}

/// An address referenced by a payment session cannot be deleted; the FK
/// violation becomes a client error rather than a 500.
#[tokio::test]
#[ignore]
async fn test_address_in_payment_session_is_not_deletable() {
    let pool = test_pool().await;
    let (customer_id, address_id) = customer_with_address(&pool).await;

    payment_sessions::create(
        &pool,
        &format!("order_it_{}", Uuid::new_v4().simple()),
        customer_id,
        address_id,
        "AMR-001",
        89900,
        &[CartItem {
            size: JarSize::Size250Ml,
            quantity: 1,
        }],
    )
    .await
    .expect("Failed to create session");

    let err = addresses::delete(&pool, address_id, customer_id)
        .await
        .expect_err("Referenced address was deleted");
    let err = map_constraint(err, ADDRESS_IN_USE, ADDRESS_IN_USE);
    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(err.to_string(), ADDRESS_IN_USE);

    // Unreferenced addresses still delete
    let (other_customer, other_address) = customer_with_address(&pool).await;
    assert!(addresses::delete(&pool, other_address, other_customer)
        .await
        .expect("Delete failed"));
}

#[tokio::test]
#[ignore]
async fn test_otp_is_single_use() {
    let pool = test_pool().await;
    let phone = unique_phone();

    otps::create(&pool, &phone, "482913", Utc::now() + Duration::minutes(5))
        .await
        .expect("Failed to create OTP");
    let recent = otps::count_recent_unused(&pool, &phone, Utc::now() - Duration::minutes(5))
        .await
        .expect("Failed to count OTPs");
    assert_eq!(recent, 1);

    assert!(!otps::consume(&pool, &phone, "000000").await.expect("consume"));
    assert!(otps::consume(&pool, &phone, "482913").await.expect("consume"));
    assert!(!otps::consume(&pool, &phone, "482913").await.expect("consume"));

    // Expired codes never verify
    otps::create(&pool, &phone, "111222", Utc::now() - Duration::minutes(1))
        .await
        .expect("Failed to create OTP");
    assert!(!otps::consume(&pool, &phone, "111222").await.expect("consume"));
}

#[tokio::test]
#[ignore]
async fn test_magic_link_is_single_use() {
    let pool = test_pool().await;
    let email = format!("admin-{}@example.com", Uuid::new_v4().simple());
    let token = amrytum_backend::services::auth::generate_magic_token();

    let admin = admins::upsert_magic_link(&pool, &email, &token, Utc::now() + Duration::minutes(15))
        .await
        .expect("Failed to store magic link");

    let consumed = admins::consume_magic_link(&pool, &token)
        .await
        .expect("Failed to consume link")
        .expect("Link rejected");
    assert_eq!(consumed.id, admin.id);

    let again = admins::consume_magic_link(&pool, &token)
        .await
        .expect("Failed to consume link");
    assert!(again.is_none());
}

/// Razorpay's checkout signature over `<order_id>|<payment_id>`.
#[test]
fn test_payment_signature_verification() {
    let secret = "rzp_test_secret";
    let signature = razorpay::sign(secret, b"order_ABC|pay_XYZ").expect("Failed to sign");

    assert!(razorpay::verify_payment_signature(
        secret,
        "order_ABC",
        "pay_XYZ",
        &signature
    ));
    assert!(!razorpay::verify_payment_signature(
        secret,
        "order_ABC",
        "pay_OTHER",
        &signature
    ));
    assert!(!razorpay::verify_payment_signature(
        "",
        "order_ABC",
        "pay_XYZ",
        &signature
    ));
}

#[test]
fn test_webhook_signature_covers_raw_body() {
    let secret = "whsec_test";
    let body = br#"{"event":"payment.captured"}"#;
    let signature = razorpay::sign(secret, body).expect("Failed to sign");

    assert!(razorpay::verify_webhook_signature(secret, body, &signature));
    assert!(!razorpay::verify_webhook_signature(
        secret,
        br#"{"event": "payment.captured"}"#,
        &signature
    ));
}

#[test]
fn test_admin_and_customer_tokens_are_not_interchangeable() {
    let tokens = TokenService::new("integration-secret-at-least-32-chars", 7, 30);
    let admin = tokens
        .sign_admin(Uuid::new_v4(), "owner@amrytum.in")
        .expect("Failed to sign admin token");
    let customer = tokens
        .sign_customer(Uuid::new_v4(), "9876543210")
        .expect("Failed to sign customer token");

    assert!(tokens.verify_admin(&admin).is_some());
    assert!(tokens.verify_customer(&customer).is_some());
    assert!(tokens.verify_admin(&customer).is_none());
    assert!(tokens.verify_customer(&admin).is_none());
}

#[tokio::test]
async fn test_local_storage_roundtrip() {
    let root = std::env::temp_dir().join(format!("amrytum-it-{}", Uuid::new_v4()));
    let storage = Storage::local(&root, "/api/uploads");

    let key = storage::lab_report_key("AMR-001", "fat test.pdf", 1_700_000_000_000);
    assert_eq!(key, "lab-reports/AMR-001/1700000000000-fat-test.pdf");

    storage
        .upload(&key, b"%PDF-1.4 test", "application/pdf")
        .await
        .expect("Upload failed");
    assert!(root.join(&key).exists());

    let url = storage
        .signed_url(&key, storage::SIGNED_URL_TTL_SECS)
        .await
        .expect("Failed to build URL");
    assert_eq!(url, format!("/api/uploads/{key}"));

    storage.delete(&key).await.expect("Delete failed");
    assert!(!root.join(&key).exists());
    // Deleting twice is fine
    tokio_test::assert_ok!(storage.delete(&key).await);

    let _ = std::fs::remove_dir_all(&root);
}
