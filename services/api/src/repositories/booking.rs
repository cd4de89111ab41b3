//! Booking repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use super::{BookingFilter, BookingStore, CancelOutcome, MarkPaidOutcome};
use crate::models::booking::{Booking, BookingStatus, NewBooking, PaymentStatus};

const BOOKING_COLUMNS: &str = "id, client_name, client_email, client_phone, service_type, \
     description, location, scheduled_date, duration_hours, price_cents, status, payment_status, \
     checkout_session_id, notes, paid_at, created_at, updated_at";

/// Booking repository
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a new booking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: Uuid) -> DatabaseResult<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_booking).transpose()
    }
}

fn decode<T: std::str::FromStr<Err = String>>(row: &PgRow, column: &str) -> DatabaseResult<T> {
    let raw: String = row.get(column);
    raw.parse().map_err(DatabaseError::Decode)
}

fn map_booking(row: &PgRow) -> DatabaseResult<Booking> {
    Ok(Booking {
        id: row.get("id"),
        client_name: row.get("client_name"),
        client_email: row.get("client_email"),
        client_phone: row.get("client_phone"),
        service_type: decode(row, "service_type")?,
        description: row.get("description"),
        location: row.get("location"),
        scheduled_date: row.get("scheduled_date"),
        duration_hours: row.get("duration_hours"),
        price_cents: row.get("price_cents"),
        status: decode(row, "status")?,
        payment_status: decode(row, "payment_status")?,
        checkout_session_id: row.get("checkout_session_id"),
        notes: row.get("notes"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl BookingStore for BookingRepository {
    async fn insert(&self, booking: &NewBooking) -> DatabaseResult<Booking> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO bookings (id, client_name, client_email, client_phone, service_type,
                                  description, location, scheduled_date, duration_hours,
                                  price_cents, status, payment_status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', 'pending', $11)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&booking.client_name)
        .bind(&booking.client_email)
        .bind(&booking.client_phone)
        .bind(booking.service_type.as_str())
        .bind(&booking.description)
        .bind(&booking.location)
        .bind(booking.scheduled_date)
        .bind(booking.duration_hours)
        .bind(booking.price_cents)
        .bind(&booking.notes)
        .fetch_one(&self.pool)
        .await?;

        let booking = map_booking(&row)?;
        info!(booking_id = %booking.id, "Pending booking stored");
        Ok(booking)
    }

    async fn attach_checkout_session(&self, id: Uuid, session_id: &str) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET checkout_session_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Booking>> {
        self.fetch(id).await
    }

    async fn find_by_checkout_session(&self, session_id: &str) -> DatabaseResult<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE checkout_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_booking).transpose()
    }

    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> DatabaseResult<MarkPaidOutcome> {
        // The WHERE clause is the serialization point for concurrent
        // deliveries: only one UPDATE can observe the pending state.
        let row = sqlx::query(&format!(
            r#"
            UPDATE bookings
            SET status = 'confirmed', payment_status = 'paid', paid_at = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending' AND payment_status = 'pending'
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(paid_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(MarkPaidOutcome::Confirmed(map_booking(&row)?));
        }

        debug!(booking_id = %id, "Booking not in payable state");
        Ok(match self.fetch(id).await? {
            None => MarkPaidOutcome::NotFound,
            Some(booking) if booking.payment_status == PaymentStatus::Paid => {
                MarkPaidOutcome::AlreadyPaid(booking)
            }
            Some(booking) => MarkPaidOutcome::NotPayable(booking),
        })
    }

    async fn cancel(&self, id: Uuid) -> DatabaseResult<CancelOutcome> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE bookings
            SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'confirmed')
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(CancelOutcome::Cancelled(map_booking(&row)?));
        }

        Ok(match self.fetch(id).await? {
            None => CancelOutcome::NotFound,
            Some(booking) => CancelOutcome::NotCancellable(booking),
        })
    }

    async fn list(&self, filter: &BookingFilter) -> DatabaseResult<(Vec<Booking>, i64)> {
        let status = filter.status.map(|s| s.as_str());
        let service_type = filter.service_type.map(|s| s.as_str());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR service_type = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(status)
        .bind(service_type)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR service_type = $2)
            "#,
        )
        .bind(status)
        .bind(service_type)
        .fetch_one(&self.pool)
        .await?;

        let bookings = rows.iter().map(map_booking).collect::<DatabaseResult<Vec<_>>>()?;
        Ok((bookings, total))
    }

    async fn status_counts(&self) -> DatabaseResult<Vec<(BookingStatus, i64)>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM bookings GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts: Vec<(BookingStatus, i64)> =
            BookingStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for row in &rows {
            let status: BookingStatus = decode(row, "status")?;
            let count: i64 = row.get("count");
            if let Some(entry) = counts.iter_mut().find(|(s, _)| *s == status) {
                entry.1 = count;
            }
        }
        Ok(counts)
    }
}
