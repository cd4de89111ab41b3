//! Payment processor abstraction
//!
//! The checkout flow talks to the processor only through
//! [`PaymentProcessor`], so tests can swap in a fake and the HTTP client
//! can be replaced without touching the orchestration.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod signature;
pub mod stripe;

pub use stripe::{StripeClient, StripeConfig};

/// What a checkout line item charges
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItemPrice {
    /// A price object configured at the processor
    PriceId(String),
    /// Ad-hoc price data
    Inline {
        currency: String,
        unit_amount_cents: i64,
        product_name: String,
    },
}

/// Parameters for a hosted checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub booking_id: Uuid,
    pub price: LineItemPrice,
    pub quantity: i64,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub client_reference_id: String,
    pub metadata: BTreeMap<String, String>,
}

/// Session created by the processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Error, Debug)]
pub enum ProcessorError {
    /// Transient failure that outlived every retry
    #[error("Payment processor unavailable: {0}")]
    Unavailable(String),

    /// The processor refused the request
    #[error("Payment processor rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected payment processor response: {0}")]
    InvalidResponse(String),

    #[error("Payment processor is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError>;
}
