//! Checkout orchestration
//!
//! [`CheckoutService::initiate`] turns a booking request into a pending
//! booking plus a hosted checkout session. The pending row is written
//! before the processor is contacted, so a webhook can never arrive for a
//! booking that does not exist yet. A processor failure leaves the row in
//! place.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use auth::validation::{validate_email, validate_max_len, validate_required};
use chrono::{DateTime, NaiveDate, Utc};
use common::error::DatabaseError;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    models::booking::{Booking, CheckoutRequest, CheckoutResponse, NewBooking, ServiceType},
    payment::{
        CheckoutSessionRequest, LineItemPrice, PaymentProcessor, ProcessorError, StripeConfig,
    },
    pricing::RateTable,
    repositories::BookingStore,
};

pub const MIN_DURATION_HOURS: i32 = 1;
pub const MAX_DURATION_HOURS: i32 = 24;

const SESSION_PLACEHOLDER: &str = "session_id={CHECKOUT_SESSION_ID}";

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    /// The pending booking vanished before the session could be attached
    #[error("Booking {0} disappeared during checkout")]
    BookingLost(Uuid),
}

/// Redirects, currency and price ids used when opening a session
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub price_ids: HashMap<String, String>,
}

fn with_session_placeholder(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{SESSION_PLACEHOLDER}")
}

impl CheckoutConfig {
    pub fn from_stripe(config: &StripeConfig) -> Self {
        Self {
            success_url: with_session_placeholder(&config.success_url),
            cancel_url: with_session_placeholder(&config.cancel_url),
            currency: config.currency.clone(),
            price_ids: config.price_ids.clone(),
        }
    }
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
pub fn parse_scheduled_date(value: &str) -> Result<DateTime<Utc>, CheckoutError> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            CheckoutError::Validation(
                "Invalid scheduled_date. Use RFC 3339 or YYYY-MM-DD".to_string(),
            )
        })
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(request: CheckoutRequest) -> Result<NewBooking, CheckoutError> {
    let invalid = CheckoutError::Validation;

    let service_type: ServiceType = request.service_type.trim().parse().map_err(invalid)?;

    let client_name = request.client_name.trim().to_string();
    validate_required("Client name", &client_name, 255).map_err(invalid)?;

    let client_email = request.client_email.trim().to_lowercase();
    validate_email(&client_email).map_err(invalid)?;

    if !(MIN_DURATION_HOURS..=MAX_DURATION_HOURS).contains(&request.duration) {
        return Err(invalid(format!(
            "Duration must be between {MIN_DURATION_HOURS} and {MAX_DURATION_HOURS} hours"
        )));
    }

    let scheduled_date = parse_scheduled_date(&request.scheduled_date)?;

    let client_phone = optional(request.client_phone);
    let description = optional(request.description);
    let location = optional(request.location);
    let notes = optional(request.notes);
    for (field, value, max) in [
        ("Phone", &client_phone, 50),
        ("Description", &description, 1000),
        ("Location", &location, 500),
        ("Notes", &notes, 1000),
    ] {
        if let Some(value) = value {
            validate_max_len(field, value, max).map_err(invalid)?;
        }
    }

    Ok(NewBooking {
        client_name,
        client_email,
        client_phone,
        service_type,
        description,
        location,
        scheduled_date,
        duration_hours: request.duration,
        price_cents: 0,
        notes,
    })
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn BookingStore>,
    processor: Arc<dyn PaymentProcessor>,
    rates: RateTable,
    config: CheckoutConfig,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        processor: Arc<dyn PaymentProcessor>,
        rates: RateTable,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            store,
            processor,
            rates,
            config,
        }
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    fn session_request(&self, booking: &Booking) -> CheckoutSessionRequest {
        let service = booking.service_type;
        let price = match self.config.price_ids.get(service.as_str()) {
            Some(price_id) => LineItemPrice::PriceId(price_id.clone()),
            None => LineItemPrice::Inline {
                currency: self.config.currency.clone(),
                unit_amount_cents: self.rates.hourly_rate(service),
                product_name: service.display_name().to_string(),
            },
        };

        let metadata = BTreeMap::from([
            ("booking_id".to_string(), booking.id.to_string()),
            ("service_type".to_string(), service.as_str().to_string()),
            ("duration".to_string(), booking.duration_hours.to_string()),
            ("client_name".to_string(), booking.client_name.clone()),
        ]);

        CheckoutSessionRequest {
            booking_id: booking.id,
            price,
            quantity: i64::from(booking.duration_hours),
            customer_email: booking.client_email.clone(),
            success_url: self.config.success_url.clone(),
            cancel_url: self.config.cancel_url.clone(),
            client_reference_id: booking.id.to_string(),
            metadata,
        }
    }

    /// Validate, price and persist the booking, then open a checkout session
    pub async fn initiate(&self, request: CheckoutRequest) -> Result<CheckoutResponse, CheckoutError> {
        let mut new_booking = validate(request)?;
        new_booking.price_cents = self
            .rates
            .price_cents(new_booking.service_type, new_booking.duration_hours)
            .ok_or_else(|| CheckoutError::Validation("Booking price is out of range".to_string()))?;

        let booking = self.store.insert(&new_booking).await?;
        info!(
            booking_id = %booking.id,
            service_type = %booking.service_type,
            price_cents = booking.price_cents,
            "Pending booking created"
        );

        let session = match self
            .processor
            .create_checkout_session(&self.session_request(&booking))
            .await
        {
            Ok(session) => session,
            Err(e) => {
                error!(booking_id = %booking.id, error = %e, "Checkout session creation failed");
                return Err(e.into());
            }
        };

        if !self.store.attach_checkout_session(booking.id, &session.id).await? {
            warn!(booking_id = %booking.id, session_id = %session.id, "Booking missing when attaching session");
            return Err(CheckoutError::BookingLost(booking.id));
        }

        info!(booking_id = %booking.id, session_id = %session.id, "Checkout session attached");
        Ok(CheckoutResponse {
            checkout_url: session.url,
            session_id: session.id,
            booking_id: booking.id,
        })
    }

    /// Booking behind a checkout session, for the redirect pages
    pub async fn booking_for_session(&self, session_id: &str) -> Result<Option<Booking>, CheckoutError> {
        Ok(self.store.find_by_checkout_session(session_id).await?)
    }
}
