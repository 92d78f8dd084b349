use reqwest::Client;

use crate::config::{TwilioConfig, OTP_EXPIRY_MINUTES};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Delivers OTP codes. Sends through Twilio when configured, otherwise only logs.
pub enum SmsSender {
    Twilio { http: Client, config: TwilioConfig },
    Log,
}

impl SmsSender {
    pub fn new(config: Option<TwilioConfig>) -> Self {
        match config {
            Some(config) => Self::Twilio {
                http: Client::new(),
                config,
            },
            None => Self::Log,
        }
    }

    pub async fn send_otp(&self, phone: &str, otp_code: &str) -> Result<(), SmsError> {
        match self {
            Self::Log => {
                tracing::info!(phone = %phone, otp = %otp_code, "OTP generated (SMS not configured)");
                Ok(())
            }
            Self::Twilio { http, config } => {
                let to = to_e164(phone);
                let url = format!(
                    "{}/Accounts/{}/Messages.json",
                    TWILIO_API_BASE, config.account_sid
                );
                let response = http
                    .post(&url)
                    .basic_auth(&config.account_sid, Some(&config.auth_token))
                    .form(&[
                        ("From", config.from_number.as_str()),
                        ("To", to.as_str()),
                        ("Body", otp_message(otp_code).as_str()),
                    ])
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(SmsError::Rejected {
                        status: status.as_u16(),
                        body,
                    });
                }
                tracing::info!(to = %to, "OTP SMS sent");
                Ok(())
            }
        }
    }
}

pub fn otp_message(otp_code: &str) -> String {
    format!(
        "Your AMRYTUM verification code is {otp_code}. Valid for {OTP_EXPIRY_MINUTES} minutes."
    )
}

/// E.164 form for Indian numbers.
pub fn to_e164(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        return format!("+91{digits}");
    }
    if digits.len() == 12 && digits.starts_with("91") {
        return format!("+{digits}");
    }
    let start = digits.len().saturating_sub(10);
    format!("+91{}", &digits[start..])
}

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("SMS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMS provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
}
