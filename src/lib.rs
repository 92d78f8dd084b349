//! AMRYTUM storefront backend
//!
//! HTTP API for a small-batch ghee brand: public catalog and batch transparency
//! pages, phone OTP login, cart checkout with Razorpay or cash on delivery, and a
//! back office for farms, batches, jars, lab reports and orders.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
