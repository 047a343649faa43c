//! Database repository for payment attempts.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::models::payments::{Payment, PaymentCreateDBRequest, PaymentWithBooking};
use crate::types::{BookingId, PaymentId, UserId};

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert a new pending payment row.
    #[instrument(skip(self, request), fields(booking_id = request.booking_id), err)]
    pub async fn create(&mut self, request: &PaymentCreateDBRequest) -> Result<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (booking_id, amount, status, checkout_url, payment_intent_id, source_id)
            VALUES ($1, $2, 'pending', $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.booking_id)
        .bind(request.amount)
        .bind(&request.checkout_url)
        .bind(&request.payment_intent_id)
        .bind(&request.source_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payment)
    }

    /// The authoritative payment for a booking: most recent by creation time.
    #[instrument(skip(self), err)]
    pub async fn latest_for_booking(&mut self, booking_id: BookingId) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE booking_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(payment)
    }

    /// Get a payment by ID.
    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(payment)
    }

    /// Find a payment by its gateway payment-intent identifier (webhook path).
    #[instrument(skip(self), err)]
    pub async fn find_by_intent(&mut self, payment_intent_id: &str) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE payment_intent_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(payment_intent_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(payment)
    }

    /// List all payments against the user's bookings, newest first.
    #[instrument(skip(self), err)]
    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<PaymentWithBooking>> {
        let payments = sqlx::query_as::<_, PaymentWithBooking>(
            r#"
            SELECT p.id, p.booking_id, p.amount, p.status, p.checkout_url,
                   p.payment_intent_id, p.source_id, p.created_at, p.updated_at,
                   b.vehicle_name, b.company_name, b.start_date, b.end_date
            FROM payments p
            JOIN bookings b ON b.id = p.booking_id
            WHERE b.user_id = $1
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(payments)
    }

    /// Transition a pending payment to `paid`.
    ///
    /// Conditional on `status = 'pending'`: when the pull and push
    /// reconciliation paths race, exactly one of them observes an affected
    /// row and the other sees the transition already applied.
    #[instrument(skip(self), err)]
    pub async fn mark_paid(&mut self, id: PaymentId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'paid', updated_at = NOW() WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition a pending payment to `failed`.
    #[instrument(skip(self), err)]
    pub async fn mark_failed(&mut self, id: PaymentId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'failed', updated_at = NOW() WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Refresh the gateway source id reported by a webhook event.
    #[instrument(skip(self), err)]
    pub async fn set_source(&mut self, id: PaymentId, source_id: &str) -> Result<()> {
        sqlx::query("UPDATE payments SET source_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(source_id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }
}
