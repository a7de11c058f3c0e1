// Bursar Gateway - PayMongo integration for the Bursar billing server

pub mod client;
pub mod config;
pub mod events;
pub mod webhook;

pub use client::{CheckoutLineItem, CheckoutRequest, CheckoutSession, PayMongoClient};
pub use config::PayMongoConfig;
pub use events::{CheckoutMetadata, WebhookEnvelope};
pub use webhook::{verify_signature, SignatureHeader};

/// Errors surfaced by the gateway client and webhook verifier.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Network(String),

    #[error("Gateway returned {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),

    #[error("Webhook signature header missing or malformed: {0}")]
    MalformedSignature(String),

    #[error("Webhook signature mismatch")]
    InvalidSignature,
}
