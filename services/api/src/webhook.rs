//! Payment webhook reconciliation
//!
//! Verifies processor callbacks and applies `checkout.session.completed`
//! to the booking ledger. Nothing is parsed before the signature checks
//! out. Replays are harmless because the paid transition is conditional.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use common::error::DatabaseError;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    payment::{
        StripeConfig,
        signature::{self, SignatureError},
    },
    repositories::{BookingStore, MarkPaidOutcome},
};

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Invalid webhook signature: {0}")]
    Signature(#[from] SignatureError),

    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),

    /// A completed session that names no booking
    #[error("Checkout session {0} carries no booking reference")]
    MissingCorrelation(String),

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl WebhookError {
    /// Whether the delivery itself was bad, as opposed to failing to apply
    pub fn is_rejected_delivery(&self) -> bool {
        matches!(self, WebhookError::Signature(_) | WebhookError::MalformedEvent(_))
    }
}

/// What a verified delivery did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Confirmed(Uuid),
    AlreadyPaid(Uuid),
    /// The booking left the payable state (e.g. cancelled) before payment landed
    NotPayable(Uuid),
    /// Recognized event that does not touch the ledger
    Observed(String),
    Ignored(String),
}

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CompletedSession {
    id: String,
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentIntent {
    #[serde(default)]
    id: String,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Clone)]
pub struct WebhookReconciler {
    store: Arc<dyn BookingStore>,
    secret: String,
    tolerance: Duration,
}

impl WebhookReconciler {
    pub fn new(store: Arc<dyn BookingStore>, secret: impl Into<String>, tolerance: Duration) -> Self {
        Self {
            store,
            secret: secret.into(),
            tolerance,
        }
    }

    pub fn from_stripe(store: Arc<dyn BookingStore>, config: &StripeConfig) -> Self {
        Self::new(
            store,
            config.webhook_secret.clone(),
            Duration::from_secs(config.webhook_tolerance_secs),
        )
    }

    /// Verify and apply one delivery
    pub async fn handle(&self, payload: &[u8], signature_header: &str) -> Result<WebhookOutcome, WebhookError> {
        if let Err(e) = signature::verify(payload, signature_header, &self.secret, self.tolerance) {
            warn!(error = %e, "Rejected webhook delivery");
            return Err(e.into());
        }

        let event: Event = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::MalformedEvent(e.to_string()))?;
        info!(event_id = %event.id, event_type = %event.event_type, "Webhook event received");

        match event.event_type.as_str() {
            CHECKOUT_COMPLETED => {
                let session: CompletedSession = serde_json::from_value(event.data.object)
                    .map_err(|e| WebhookError::MalformedEvent(e.to_string()))?;
                self.complete_checkout(&event.id, session).await
            }
            PAYMENT_SUCCEEDED | PAYMENT_FAILED => {
                let intent: PaymentIntent =
                    serde_json::from_value(event.data.object).unwrap_or_default();
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    payment_intent = %intent.id,
                    amount = intent.amount,
                    booking_id = intent.metadata.get("booking_id").map(String::as_str).unwrap_or(""),
                    "Payment intent event observed"
                );
                Ok(WebhookOutcome::Observed(event.event_type))
            }
            _ => {
                debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring unhandled event type");
                Ok(WebhookOutcome::Ignored(event.event_type))
            }
        }
    }

    async fn resolve_booking(&self, session: &CompletedSession) -> Result<Uuid, WebhookError> {
        let referenced = session
            .client_reference_id
            .as_deref()
            .or_else(|| session.metadata.get("booking_id").map(String::as_str))
            .and_then(|value| Uuid::parse_str(value).ok());
        if let Some(id) = referenced {
            return Ok(id);
        }

        match self.store.find_by_checkout_session(&session.id).await? {
            Some(booking) => Ok(booking.id),
            None => Err(WebhookError::MissingCorrelation(session.id.clone())),
        }
    }

    async fn complete_checkout(
        &self,
        event_id: &str,
        session: CompletedSession,
    ) -> Result<WebhookOutcome, WebhookError> {
        let booking_id = match self.resolve_booking(&session).await {
            Ok(id) => id,
            Err(e) => {
                error!(event_id, session_id = %session.id, error = %e, "Cannot correlate checkout session");
                return Err(e);
            }
        };

        match self.store.mark_paid(booking_id, Utc::now()).await? {
            MarkPaidOutcome::Confirmed(booking) => {
                info!(event_id, booking_id = %booking.id, session_id = %session.id, "Booking confirmed and paid");
                Ok(WebhookOutcome::Confirmed(booking.id))
            }
            MarkPaidOutcome::AlreadyPaid(booking) => {
                info!(event_id, booking_id = %booking.id, "Booking already paid; replay acknowledged");
                Ok(WebhookOutcome::AlreadyPaid(booking.id))
            }
            MarkPaidOutcome::NotPayable(booking) => {
                warn!(
                    event_id,
                    booking_id = %booking.id,
                    status = %booking.status,
                    "Payment completed for a booking that is no longer payable"
                );
                Ok(WebhookOutcome::NotPayable(booking.id))
            }
            MarkPaidOutcome::NotFound => {
                error!(event_id, booking_id = %booking_id, "Completed checkout references an unknown booking");
                Err(WebhookError::BookingNotFound(booking_id))
            }
        }
    }
}
