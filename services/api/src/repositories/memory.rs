//! In-process booking ledger

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BookingFilter, BookingStore, CancelOutcome, MarkPaidOutcome};
use crate::models::booking::{Booking, BookingStatus, NewBooking, PaymentStatus};

/// [`BookingStore`] backed by a map behind a write lock. Each transition
/// holds the lock for its check and update, mirroring the conditional
/// UPDATE of the PostgreSQL repository.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<Uuid, Booking>>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored booking
    pub async fn all(&self) -> Vec<Booking> {
        self.bookings.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: &NewBooking) -> DatabaseResult<Booking> {
        let now = Utc::now();
        let stored = Booking {
            id: Uuid::new_v4(),
            client_name: booking.client_name.clone(),
            client_email: booking.client_email.clone(),
            client_phone: booking.client_phone.clone(),
            service_type: booking.service_type,
            description: booking.description.clone(),
            location: booking.location.clone(),
            scheduled_date: booking.scheduled_date,
            duration_hours: booking.duration_hours,
            price_cents: booking.price_cents,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            checkout_session_id: None,
            notes: booking.notes.clone(),
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        self.bookings.write().await.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn attach_checkout_session(&self, id: Uuid, session_id: &str) -> DatabaseResult<bool> {
        let mut bookings = self.bookings.write().await;
        Ok(match bookings.get_mut(&id) {
            Some(booking) => {
                booking.checkout_session_id = Some(session_id.to_string());
                booking.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn find_by_checkout_session(&self, session_id: &str) -> DatabaseResult<Option<Booking>> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .find(|b| b.checkout_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> DatabaseResult<MarkPaidOutcome> {
        let mut bookings = self.bookings.write().await;
        let Some(booking) = bookings.get_mut(&id) else {
            return Ok(MarkPaidOutcome::NotFound);
        };

        if booking.payment_status == PaymentStatus::Paid {
            return Ok(MarkPaidOutcome::AlreadyPaid(booking.clone()));
        }
        if booking.status != BookingStatus::Pending {
            return Ok(MarkPaidOutcome::NotPayable(booking.clone()));
        }

        booking.status = BookingStatus::Confirmed;
        booking.payment_status = PaymentStatus::Paid;
        booking.paid_at = Some(paid_at);
        booking.updated_at = Utc::now();
        Ok(MarkPaidOutcome::Confirmed(booking.clone()))
    }

    async fn cancel(&self, id: Uuid) -> DatabaseResult<CancelOutcome> {
        let mut bookings = self.bookings.write().await;
        let Some(booking) = bookings.get_mut(&id) else {
            return Ok(CancelOutcome::NotFound);
        };

        if !booking.status.is_cancellable() {
            return Ok(CancelOutcome::NotCancellable(booking.clone()));
        }

        booking.status = BookingStatus::Cancelled;
        booking.updated_at = Utc::now();
        Ok(CancelOutcome::Cancelled(booking.clone()))
    }

    async fn list(&self, filter: &BookingFilter) -> DatabaseResult<(Vec<Booking>, i64)> {
        let bookings = self.bookings.read().await;
        let mut matching: Vec<Booking> = bookings
            .values()
            .filter(|b| filter.status.is_none_or(|s| b.status == s))
            .filter(|b| filter.service_type.is_none_or(|s| b.service_type == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn status_counts(&self) -> DatabaseResult<Vec<(BookingStatus, i64)>> {
        let bookings = self.bookings.read().await;
        Ok(BookingStatus::ALL
            .into_iter()
            .map(|status| {
                let count = bookings.values().filter(|b| b.status == status).count() as i64;
                (status, count)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::ServiceType;

    fn new_booking(service_type: ServiceType) -> NewBooking {
        NewBooking {
            client_name: "Sam Client".to_string(),
            client_email: "sam@example.com".to_string(),
            client_phone: None,
            service_type,
            description: None,
            location: None,
            scheduled_date: Utc::now(),
            duration_hours: 2,
            price_cents: 30_000,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_mark_paid_is_applied_once() {
        let store = InMemoryBookingStore::new();
        let booking = store.insert(&new_booking(ServiceType::Portrait)).await.unwrap();
        let paid_at = Utc::now();

        let first = store.mark_paid(booking.id, paid_at).await.unwrap();
        let MarkPaidOutcome::Confirmed(confirmed) = first else {
            panic!("expected confirmation, got {first:?}");
        };
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.payment_status, PaymentStatus::Paid);
        assert_eq!(confirmed.paid_at, Some(paid_at));

        let second = store.mark_paid(booking.id, Utc::now()).await.unwrap();
        let MarkPaidOutcome::AlreadyPaid(unchanged) = second else {
            panic!("expected already paid, got {second:?}");
        };
        assert_eq!(unchanged.paid_at, Some(paid_at));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_mark_paid_has_one_winner() {
        let store = InMemoryBookingStore::new();
        let booking = store.insert(&new_booking(ServiceType::Wedding)).await.unwrap();
        let first_at = Utc::now();
        let second_at = first_at + chrono::Duration::seconds(30);
        let id = booking.id;

        let (a, b) = (store.clone(), store.clone());
        let (first, second) = tokio::join!(
            tokio::spawn(async move { a.mark_paid(id, first_at).await }),
            tokio::spawn(async move { b.mark_paid(id, second_at).await }),
        );
        let outcomes = [first.unwrap().unwrap(), second.unwrap().unwrap()];

        let winners: Vec<&Booking> = outcomes
            .iter()
            .filter_map(|o| match o {
                MarkPaidOutcome::Confirmed(b) => Some(b),
                _ => None,
            })
            .collect();
        let losers: Vec<&Booking> = outcomes
            .iter()
            .filter_map(|o| match o {
                MarkPaidOutcome::AlreadyPaid(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(winners.len(), 1, "outcomes: {outcomes:?}");
        assert_eq!(losers.len(), 1, "outcomes: {outcomes:?}");

        let winning_paid_at = winners[0].paid_at;
        assert!(winning_paid_at == Some(first_at) || winning_paid_at == Some(second_at));
        assert_eq!(losers[0].paid_at, winning_paid_at);

        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.paid_at, winning_paid_at);
    }

    #[tokio::test]
    async fn test_cancelled_booking_is_not_payable() {
        let store = InMemoryBookingStore::new();
        let booking = store.insert(&new_booking(ServiceType::Event)).await.unwrap();

        assert!(matches!(
            store.cancel(booking.id).await.unwrap(),
            CancelOutcome::Cancelled(_)
        ));
        assert!(matches!(
            store.cancel(booking.id).await.unwrap(),
            CancelOutcome::NotCancellable(_)
        ));

        let outcome = store.mark_paid(booking.id, Utc::now()).await.unwrap();
        let MarkPaidOutcome::NotPayable(stored) = outcome else {
            panic!("expected not payable, got {outcome:?}");
        };
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(stored.paid_at, None);
    }

    #[tokio::test]
    async fn test_unknown_booking() {
        let store = InMemoryBookingStore::new();
        assert_eq!(
            store.mark_paid(Uuid::new_v4(), Utc::now()).await.unwrap(),
            MarkPaidOutcome::NotFound
        );
        assert_eq!(store.cancel(Uuid::new_v4()).await.unwrap(), CancelOutcome::NotFound);
        assert!(!store.attach_checkout_session(Uuid::new_v4(), "cs_x").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_and_counts() {
        let store = InMemoryBookingStore::new();
        let wedding = store.insert(&new_booking(ServiceType::Wedding)).await.unwrap();
        store.insert(&new_booking(ServiceType::Nature)).await.unwrap();
        store.insert(&new_booking(ServiceType::Nature)).await.unwrap();
        store.cancel(wedding.id).await.unwrap();

        let filter = BookingFilter {
            service_type: Some(ServiceType::Nature),
            limit: 1,
            ..BookingFilter::default()
        };
        let (page, total) = store.list(&filter).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);

        let counts = store.status_counts().await.unwrap();
        assert!(counts.contains(&(BookingStatus::Pending, 2)));
        assert!(counts.contains(&(BookingStatus::Cancelled, 1)));
        assert!(counts.contains(&(BookingStatus::Refunded, 0)));
    }

    #[tokio::test]
    async fn test_find_by_checkout_session() {
        let store = InMemoryBookingStore::new();
        let booking = store.insert(&new_booking(ServiceType::Sports)).await.unwrap();
        assert!(store.attach_checkout_session(booking.id, "cs_123").await.unwrap());

        let found = store.find_by_checkout_session("cs_123").await.unwrap().unwrap();
        assert_eq!(found.id, booking.id);
        assert!(store.find_by_checkout_session("cs_999").await.unwrap().is_none());
    }
}
