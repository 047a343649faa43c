//! Database repository for change requests.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::models::requests::{EnrichedRequest, Request, RequestCreateDBRequest, RequestStatus};
use crate::types::{BookingId, RequestId, UserId};

/// Columns selected when joining requests with booking display fields.
const ENRICHED_COLUMNS: &str = r#"
    r.id, r.user_id, r.company_id, r.booking_id, r.request_type, r.status,
    r.reason, r.company_remark, r.new_start_date, r.new_end_date, r.new_rent_time,
    r.computed_fee, r.company_response, r.created_at, r.updated_at,
    b.vehicle_name,
    b.start_date AS original_start_date,
    b.end_date AS original_end_date,
    b.rent_time AS original_rent_time,
    b.company_name
"#;

pub struct Requests<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Requests<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert a new pending request.
    ///
    /// The `requests_booking_pending_unique` partial index rejects a second
    /// pending request for the same booking; that surfaces as a unique
    /// violation which the API layer maps to a conflict.
    #[instrument(skip(self, request), fields(booking_id = request.booking_id), err)]
    pub async fn create(&mut self, request: &RequestCreateDBRequest) -> Result<Request> {
        let created = sqlx::query_as::<_, Request>(
            r#"
            INSERT INTO requests (
                user_id, company_id, booking_id, request_type, status, reason,
                new_start_date, new_end_date, new_rent_time, computed_fee
            )
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.company_id)
        .bind(request.booking_id)
        .bind(request.request_type)
        .bind(&request.reason)
        .bind(request.new_start_date)
        .bind(request.new_end_date)
        .bind(request.new_rent_time)
        .bind(request.computed_fee)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(created)
    }

    /// Get a request by ID regardless of owner (company decision path).
    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: RequestId) -> Result<Option<Request>> {
        let request = sqlx::query_as::<_, Request>("SELECT * FROM requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(request)
    }

    /// Get a request by ID, scoped to its owner.
    #[instrument(skip(self), err)]
    pub async fn get_owned(&mut self, id: RequestId, user_id: UserId) -> Result<Option<Request>> {
        let request = sqlx::query_as::<_, Request>("SELECT * FROM requests WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(request)
    }

    /// Get a request joined with its booking/company display fields.
    #[instrument(skip(self), err)]
    pub async fn get_enriched(&mut self, id: RequestId) -> Result<Option<EnrichedRequest>> {
        let query = format!(
            "SELECT {ENRICHED_COLUMNS} FROM requests r JOIN bookings b ON b.id = r.booking_id WHERE r.id = $1"
        );
        let request = sqlx::query_as::<_, EnrichedRequest>(&query)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(request)
    }

    /// Get an enriched request scoped to its owner.
    #[instrument(skip(self), err)]
    pub async fn get_enriched_owned(&mut self, id: RequestId, user_id: UserId) -> Result<Option<EnrichedRequest>> {
        let query = format!(
            "SELECT {ENRICHED_COLUMNS} FROM requests r JOIN bookings b ON b.id = r.booking_id \
             WHERE r.id = $1 AND r.user_id = $2"
        );
        let request = sqlx::query_as::<_, EnrichedRequest>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(request)
    }

    /// List a user's requests (enriched), newest first.
    #[instrument(skip(self), err)]
    pub async fn list_enriched_for_user(&mut self, user_id: UserId) -> Result<Vec<EnrichedRequest>> {
        let query = format!(
            "SELECT {ENRICHED_COLUMNS} FROM requests r JOIN bookings b ON b.id = r.booking_id \
             WHERE r.user_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        );
        let requests = sqlx::query_as::<_, EnrichedRequest>(&query)
            .bind(user_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(requests)
    }

    /// Whether the booking currently has a pending request.
    #[instrument(skip(self), err)]
    pub async fn has_pending_for_booking(&mut self, booking_id: BookingId) -> Result<bool> {
        let row: Option<(RequestId,)> =
            sqlx::query_as("SELECT id FROM requests WHERE booking_id = $1 AND status = 'pending' LIMIT 1")
                .bind(booking_id)
                .fetch_optional(&mut *self.db)
                .await?;

        Ok(row.is_some())
    }

    /// Flip a pending request to its terminal status, recording the company's
    /// response and remark.
    ///
    /// Conditional on `status = 'pending'`: returns false when the request
    /// was already decided, so a second approval attempt is detected from the
    /// affected-row count rather than a separate read.
    #[instrument(skip(self, company_response, company_remark), err)]
    pub async fn mark_decided(
        &mut self,
        id: RequestId,
        status: RequestStatus,
        company_response: Option<&str>,
        company_remark: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE requests
            SET status = $2, company_response = $3, company_remark = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(company_response)
        .bind(company_remark)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The authoritative approved reschedule for a booking: highest request
    /// id wins when several were approved historically.
    #[instrument(skip(self), err)]
    pub async fn latest_approved_reschedule(&mut self, booking_id: BookingId) -> Result<Option<Request>> {
        let request = sqlx::query_as::<_, Request>(
            r#"
            SELECT * FROM requests
            WHERE booking_id = $1
              AND request_type = 'reschedule'
              AND status = 'approved'
              AND new_start_date IS NOT NULL
              AND new_end_date IS NOT NULL
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(request)
    }

    /// Bookings of this user that have an approved cancellation request but
    /// are not yet in `Cancelled` status.
    #[instrument(skip(self), err)]
    pub async fn bookings_with_unapplied_cancellation(&mut self, user_id: UserId) -> Result<Vec<BookingId>> {
        let rows: Vec<(BookingId,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT r.booking_id
            FROM requests r
            JOIN bookings b ON b.id = r.booking_id
            WHERE r.user_id = $1
              AND r.request_type = 'cancellation'
              AND r.status = 'approved'
              AND b.status != 'Cancelled'
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Fetch the id/status pairs of the given requests owned by the user.
    #[instrument(skip(self, ids), err)]
    pub async fn statuses_for_ids(&mut self, ids: &[RequestId], user_id: UserId) -> Result<Vec<(RequestId, RequestStatus)>> {
        let rows: Vec<(RequestId, RequestStatus)> =
            sqlx::query_as("SELECT id, status FROM requests WHERE id = ANY($1) AND user_id = $2")
                .bind(ids.to_vec())
                .bind(user_id)
                .fetch_all(&mut *self.db)
                .await?;

        Ok(rows)
    }

    /// Delete a request row. Callers must have checked the pending guard.
    #[instrument(skip(self), err)]
    pub async fn delete(&mut self, id: RequestId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM requests WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a batch of request rows.
    #[instrument(skip(self, ids), err)]
    pub async fn delete_many(&mut self, ids: &[RequestId]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM requests WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
