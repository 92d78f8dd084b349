use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, patch, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::services::storage::MAX_UPLOAD_BYTES;

pub mod addresses;
pub mod admin_auth;
pub mod auth;
pub mod batches;
pub mod catalog;
pub mod customers;
pub mod extract;
pub mod farms;
pub mod health;
pub mod jars;
pub mod lab_reports;
pub mod metrics;
pub mod orders;
pub mod payment;
pub mod site;

/// Room for multipart framing and the text fields around an upload.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Every API route, relative to the API prefix.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Public storefront
        .route("/catalog", get(catalog::public_catalog))
        .route("/site", get(site::public_site))
        .route("/batches/public", get(batches::list_public))
        .route("/batch/{batch_id}", get(batches::public_detail))
        .route("/batch/{batch_id}/lab-reports", get(batches::public_lab_reports))
        .route("/stock/availability", get(batches::stock_availability))
        // Customer login and account
        .route("/auth/request-otp", post(auth::request_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/me", get(auth::me))
        .route("/address", post(addresses::create).get(addresses::list))
        .route(
            "/address/{id}",
            put(addresses::update).delete(addresses::delete),
        )
        // Checkout and payment
        .route("/order/create", post(orders::checkout))
        .route("/orders/me", get(orders::my_orders))
        .route("/payment/create-order", post(payment::create_order))
        .route("/payment/create-order-cod", post(payment::create_order_cod))
        .route("/payment/verify", post(payment::verify))
        .route("/payment/webhook", post(payment::webhook))
        // Admin
        .route("/admin/auth/request-link", post(admin_auth::request_link))
        .route("/admin/auth/verify", get(admin_auth::verify_link))
        .route("/customers", post(customers::create).get(customers::list))
        .route(
            "/customers/{id}",
            get(customers::get).patch(customers::update),
        )
        .route("/farms", post(farms::create).get(farms::list))
        .route("/farms/{id}", get(farms::get))
        .route("/batches", post(batches::create).get(batches::list))
        .route("/batches/{id}", patch(batches::update))
        .route("/batches/{id}/approve", post(batches::approve))
        .route("/batches/{id}/reject", post(batches::reject))
        .route("/jars", post(jars::create).get(jars::list))
        .route("/jars/bulk", post(jars::create_bulk))
        .route("/jars/{id}", get(jars::get).patch(jars::update))
        .route(
            "/lab-reports/upload",
            post(lab_reports::upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/lab-reports", get(lab_reports::list))
        .route(
            "/lab-reports/{id}",
            get(lab_reports::get).delete(lab_reports::delete),
        )
        .route("/admin/catalog", get(catalog::list))
        .route("/admin/catalog/products", post(catalog::create))
        .route(
            "/admin/catalog/products/{id}",
            put(catalog::update).delete(catalog::delete),
        )
        .route("/admin/site", get(site::get).put(site::update))
        .route("/orders", post(orders::create).get(orders::list))
        .route("/orders/stats", get(orders::stats))
        .route("/orders/{id}", get(orders::get).patch(orders::update))
}

/// The full application: API under its prefix, local uploads, health, metrics and
/// the HTTP middleware stack.
pub fn app(state: AppState, prometheus: Arc<PrometheusHandle>) -> Router {
    let prefix = state.config.api_prefix.clone();
    let uploads = ServeDir::new(&state.config.uploads_dir);
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let api = api_router();
    let router = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&prefix, api)
    };

    router
        .nest_service(&format!("{prefix}/uploads"), uploads)
        .route("/health", get(health::health_check))
        .with_state(state)
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(prometheus),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(
            MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES,
        ))
}

/// Comma-separated origins with credentials, or any origin (mirrored) when unset.
pub fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let origin = match allowed_origins {
        Some(list) => AllowOrigin::list(
            list.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        ),
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-razorpay-signature"),
        ])
}
