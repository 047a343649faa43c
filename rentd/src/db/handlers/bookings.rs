//! Database repository for bookings.

use chrono::{NaiveDate, NaiveTime};
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::models::bookings::{Booking, BookingCreateDBRequest, BookingPaymentDBUpdate, BookingStatus};
use crate::types::{BookingId, UserId};

pub struct Bookings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Bookings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Create a new booking in `Pending` lifecycle status, unpaid.
    #[instrument(skip(self, request), fields(user_id = request.user_id), err)]
    pub async fn create(&mut self, request: &BookingCreateDBRequest) -> Result<Booking> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                user_id, user_name, mobile_number, vehicle_id, vehicle_name,
                company_id, company_name, service_type, start_date, end_date,
                rent_time, destination, occasion, message, valid_id_url,
                additional_id_url, total_cost
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(&request.user_name)
        .bind(&request.mobile_number)
        .bind(request.vehicle_id)
        .bind(&request.vehicle_name)
        .bind(request.company_id)
        .bind(&request.company_name)
        .bind(&request.service_type)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.rent_time)
        .bind(&request.destination)
        .bind(&request.occasion)
        .bind(&request.message)
        .bind(&request.valid_id_url)
        .bind(&request.additional_id_url)
        .bind(request.total_cost)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(booking)
    }

    /// Get a booking by ID regardless of owner.
    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: BookingId) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(booking)
    }

    /// Get a booking by ID, scoped to its owner.
    #[instrument(skip(self), err)]
    pub async fn get_owned(&mut self, id: BookingId, user_id: UserId) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(booking)
    }

    /// List a user's bookings, newest first.
    #[instrument(skip(self), err)]
    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE user_id = $1
            ORDER BY booking_date DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(bookings)
    }

    /// Whether the user has a booking in `Pending` or `Active` status.
    #[instrument(skip(self), err)]
    pub async fn has_open_booking(&mut self, user_id: UserId) -> Result<bool> {
        let row: Option<(BookingId,)> = sqlx::query_as(
            "SELECT id FROM bookings WHERE user_id = $1 AND status IN ('Pending', 'Active') LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(row.is_some())
    }

    /// Total number of bookings the user has ever made.
    #[instrument(skip(self), err)]
    pub async fn count_for_user(&mut self, user_id: UserId) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// Push a new schedule onto a booking. The rent time only changes when a
    /// new one is provided.
    #[instrument(skip(self), err)]
    pub async fn update_schedule(
        &mut self,
        id: BookingId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        rent_time: Option<NaiveTime>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET start_date = $2, end_date = $3, rent_time = COALESCE($4, rent_time), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(start_date)
        .bind(end_date)
        .bind(rent_time)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    /// Set a booking's status to `Cancelled`. Returns false when it already
    /// was, making repeated synchronization runs write-free.
    #[instrument(skip(self), err)]
    pub async fn mark_cancelled(&mut self, id: BookingId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'Cancelled', updated_at = NOW() WHERE id = $1 AND status != 'Cancelled'",
        )
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write payment confirmation metadata onto a booking. The lifecycle
    /// `status` stays untouched: approval remains a separate manual step.
    #[instrument(skip(self, update), err)]
    pub async fn record_payment(&mut self, id: BookingId, update: &BookingPaymentDBUpdate) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET payment_method = $2,
                payment_status = 'paid',
                transaction_id = $3,
                transaction_date = NOW(),
                reference_number = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.payment_method)
        .bind(&update.transaction_id)
        .bind(&update.reference_number)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    /// Fetch the id/status pairs of the given bookings owned by the user.
    #[instrument(skip(self, ids), err)]
    pub async fn statuses_for_ids(&mut self, ids: &[BookingId], user_id: UserId) -> Result<Vec<(BookingId, BookingStatus)>> {
        let rows: Vec<(BookingId, BookingStatus)> = sqlx::query_as(
            "SELECT id, status FROM bookings WHERE id = ANY($1) AND user_id = $2",
        )
        .bind(ids.to_vec())
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows)
    }

    /// Delete a booking row. Callers must have checked the `Cancelled` guard.
    #[instrument(skip(self), err)]
    pub async fn delete(&mut self, id: BookingId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a batch of booking rows.
    #[instrument(skip(self, ids), err)]
    pub async fn delete_many(&mut self, ids: &[BookingId]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
