//! Test helper utilities for E2E testing

use reqwest::{multipart, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::fixtures::{AddressFixture, DUMMY_OTP};

/// Response from POST /auth/verify-otp
#[derive(Debug, Deserialize)]
pub struct VerifyOtpResponse {
    pub token: String,
    pub customer: LoginCustomer,
}

#[derive(Debug, Deserialize)]
pub struct LoginCustomer {
    pub id: Uuid,
    pub phone: Option<String>,
}

/// Order fields the flows assert on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody {
    pub id: Uuid,
    pub order_id: String,
    pub payment_status: String,
    pub delivery_status: String,
    pub address: String,
    pub amount_paise: Option<i64>,
    pub jar: Option<Value>,
    pub batch: Option<Value>,
    pub shipping_address: Option<Value>,
}

pub type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

/// API root including the prefix, e.g. `http://localhost:4000/api`.
pub fn api_url(base_url: &str) -> String {
    let prefix = std::env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string());
    format!("{}{}", base_url.trim_end_matches('/'), prefix)
}

/// A random valid 10-digit phone so runs don't collide.
pub fn random_phone() -> String {
    let n = Uuid::new_v4().as_u128() % 1_000_000_000;
    format!("9{:09}", n)
}

async fn expect_status(response: reqwest::Response, expected: StatusCode) -> TestResult<Value> {
    let status = response.status();
    let body = response.text().await?;
    if status != expected {
        return Err(format!("Expected {expected}, got {status}: {body}").into());
    }
    if body.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

/// Logs in through the OTP flow using the development dummy code.
pub async fn login_customer(
    client: &reqwest::Client,
    api: &str,
    phone: &str,
) -> TestResult<VerifyOtpResponse> {
    let response = client
        .post(format!("{api}/auth/request-otp"))
        .json(&json!({ "phone": phone }))
        .send()
        .await?;
    expect_status(response, StatusCode::OK).await?;

    let response = client
        .post(format!("{api}/auth/verify-otp"))
        .json(&json!({ "phone": phone, "otp": DUMMY_OTP }))
        .send()
        .await?;
    let body = expect_status(response, StatusCode::OK).await?;
    Ok(serde_json::from_value(body)?)
}

/// Requests a magic link and follows the development `dev_link`.
pub async fn login_admin(client: &reqwest::Client, api: &str, email: &str) -> TestResult<String> {
    let response = client
        .post(format!("{api}/admin/auth/request-link"))
        .json(&json!({ "email": email }))
        .send()
        .await?;
    let body = expect_status(response, StatusCode::OK).await?;
    let link = body["dev_link"]
        .as_str()
        .ok_or("No dev_link in response (is ENVIRONMENT=production?)")?;
    let token = link
        .split("token=")
        .nth(1)
        .ok_or("dev_link has no token")?;

    let response = client
        .get(format!("{api}/admin/auth/verify"))
        .query(&[("token", token)])
        .send()
        .await?;
    let body = expect_status(response, StatusCode::OK).await?;
    Ok(body["token"].as_str().ok_or("No token")?.to_string())
}

pub async fn create_address(
    client: &reqwest::Client,
    api: &str,
    token: &str,
    address: &AddressFixture,
    is_default: bool,
) -> TestResult<Value> {
    let response = client
        .post(format!("{api}/address"))
        .bearer_auth(token)
        .json(&json!({
            "name": address.name,
            "phone": address.phone,
            "address_line1": address.address_line1,
            "address_line2": address.address_line2,
            "city": address.city,
            "state": address.state,
            "pincode": address.pincode,
            "is_default": is_default,
        }))
        .send()
        .await?;
    expect_status(response, StatusCode::CREATED).await
}

/// Single-jar checkout by batch and size.
pub async fn checkout(
    client: &reqwest::Client,
    api: &str,
    token: &str,
    batch_id: &str,
    size: &str,
) -> TestResult<reqwest::Response> {
    Ok(client
        .post(format!("{api}/order/create"))
        .bearer_auth(token)
        .json(&json!({ "batch_id": batch_id, "size": size }))
        .send()
        .await?)
}

pub async fn order_from(response: reqwest::Response) -> TestResult<OrderBody> {
    let body = expect_status(response, StatusCode::CREATED).await?;
    Ok(serde_json::from_value(body)?)
}

pub async fn stock(client: &reqwest::Client, api: &str) -> TestResult<Value> {
    let response = client.get(format!("{api}/stock/availability")).send().await?;
    expect_status(response, StatusCode::OK).await
}

/// Uploads a lab report PDF for a batch as admin.
pub async fn upload_lab_report(
    client: &reqwest::Client,
    api: &str,
    admin_token: &str,
    batch_id: &str,
    pdf: &[u8],
) -> TestResult<Value> {
    let form = multipart::Form::new()
        .part(
            "file",
            multipart::Part::bytes(pdf.to_vec())
                .file_name("e2e report.pdf")
                .mime_str("application/pdf")?,
        )
        .text("batchId", batch_id.to_string())
        .text("fatPercent", "99.6")
        .text("antibioticPass", "true");

    let response = client
        .post(format!("{api}/lab-reports/upload"))
        .bearer_auth(admin_token)
        .multipart(form)
        .send()
        .await?;
    expect_status(response, StatusCode::CREATED).await
}

/// The `error` message of a JSON error response, asserting the status.
pub async fn error_message(
    response: reqwest::Response,
    expected: StatusCode,
) -> TestResult<String> {
    let body = expect_status(response, expected).await?;
    Ok(body["error"].as_str().unwrap_or_default().to_string())
}
