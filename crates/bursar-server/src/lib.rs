//! Bursar Server - school enrollment billing API
//!
//! This crate provides the REST API server for the Bursar enrollment
//! billing and payment reconciliation backend: billing plan generation,
//! hosted checkout sessions, and webhook-driven payment completion
//! against the student ledger.

pub mod billing;
pub mod checkout;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod routes;

pub use config::AppConfig;
pub use error::AppError;
pub use routes::{create_router, AppState};
