pub mod auth;
pub mod checkout;
pub mod otp;
pub mod payment;
pub mod rate_limit;
pub mod razorpay;
pub mod sms;
pub mod storage;
