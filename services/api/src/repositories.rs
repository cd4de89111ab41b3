//! Repositories for database operations
//!
//! The booking ledger sits behind the [`BookingStore`] trait so the
//! checkout and webhook flows can run against PostgreSQL or an in-memory
//! store. Media and contact messages use concrete PostgreSQL repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus, NewBooking, ServiceType};

pub mod booking;
pub mod contact;
pub mod media;
pub mod memory;

pub use booking::BookingRepository;
pub use contact::ContactRepository;
pub use media::MediaRepository;
pub use memory::InMemoryBookingStore;

/// Result of the pending → paid transition
#[derive(Debug, Clone, PartialEq)]
pub enum MarkPaidOutcome {
    /// The booking moved to confirmed/paid by this call
    Confirmed(Booking),
    /// The booking was already paid; nothing changed
    AlreadyPaid(Booking),
    /// The booking exists but is no longer payable (e.g. cancelled)
    NotPayable(Booking),
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled(Booking),
    NotCancellable(Booking),
    NotFound,
}

/// Filters for listing bookings
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub service_type: Option<ServiceType>,
    pub limit: i64,
    pub offset: i64,
}

/// Persistence seam for the booking ledger
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Store a new booking in pending/pending state
    async fn insert(&self, booking: &NewBooking) -> DatabaseResult<Booking>;

    /// Record the processor's checkout session id. Returns false when the
    /// booking does not exist.
    async fn attach_checkout_session(&self, id: Uuid, session_id: &str) -> DatabaseResult<bool>;

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Booking>>;

    async fn find_by_checkout_session(&self, session_id: &str) -> DatabaseResult<Option<Booking>>;

    /// Move a pending booking to confirmed/paid in one conditional step.
    /// Repeating the call never changes an already-paid booking.
    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> DatabaseResult<MarkPaidOutcome>;

    /// Cancel a booking that is still pending or confirmed
    async fn cancel(&self, id: Uuid) -> DatabaseResult<CancelOutcome>;

    /// Newest first, with the total count matching the filter
    async fn list(&self, filter: &BookingFilter) -> DatabaseResult<(Vec<Booking>, i64)>;

    /// Number of bookings per status, including zero counts
    async fn status_counts(&self) -> DatabaseResult<Vec<(BookingStatus, i64)>>;
}
