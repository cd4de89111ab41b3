//! Booking models for the API service

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PageInfo;

/// Photography service offered for booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Portrait,
    Wedding,
    Event,
    Commercial,
    Sports,
    Nature,
}

impl ServiceType {
    pub const ALL: [ServiceType; 6] = [
        ServiceType::Portrait,
        ServiceType::Wedding,
        ServiceType::Event,
        ServiceType::Commercial,
        ServiceType::Sports,
        ServiceType::Nature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Portrait => "portrait",
            ServiceType::Wedding => "wedding",
            ServiceType::Event => "event",
            ServiceType::Commercial => "commercial",
            ServiceType::Sports => "sports",
            ServiceType::Nature => "nature",
        }
    }

    /// Product name shown on the hosted checkout page
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceType::Portrait => "Portrait Session",
            ServiceType::Wedding => "Wedding Photography",
            ServiceType::Event => "Event Photography",
            ServiceType::Commercial => "Commercial Photography",
            ServiceType::Sports => "Sports Photography",
            ServiceType::Nature => "Nature Photography",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| format!("Invalid service type: {s}"))
    }
}

/// Booking lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
        }
    }

    /// Statuses an administrator may still cancel from
    pub fn is_cancellable(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid booking status: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("Invalid payment status: {other}")),
        }
    }
}

/// One requested photography engagement.
///
/// `paid_at` is set exactly when `payment_status` is `Paid`, and `status`
/// only becomes `Confirmed` through the payment transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub location: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    pub duration_hours: i32,
    pub price_cents: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub checkout_session_id: Option<String>,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated booking fields, stored as a pending booking
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub location: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    pub duration_hours: i32,
    pub price_cents: i64,
    pub notes: Option<String>,
}

/// Body of `POST /api/stripe/checkout`
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub client_phone: Option<String>,
    pub service_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub scheduled_date: String,
    pub duration: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of a successful checkout initiation
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
    pub booking_id: Uuid,
}

/// Booking as returned by the API, with the price in currency units
#[derive(Debug, Clone, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub location: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    pub duration: i32,
    pub price: f64,
    pub price_cents: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            client_name: booking.client_name.clone(),
            client_email: booking.client_email.clone(),
            client_phone: booking.client_phone.clone(),
            service_type: booking.service_type,
            description: booking.description.clone(),
            location: booking.location.clone(),
            scheduled_date: booking.scheduled_date,
            duration: booking.duration_hours,
            price: booking.price_cents as f64 / 100.0,
            price_cents: booking.price_cents,
            status: booking.status,
            payment_status: booking.payment_status,
            notes: booking.notes.clone(),
            paid_at: booking.paid_at,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

/// Query parameters for the admin booking list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
    pub service_type: Option<ServiceType>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingResponse>,
    #[serde(flatten)]
    pub page: PageInfo,
}
