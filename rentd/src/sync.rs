//! Booking synchronization: converging a booking's stored schedule and
//! status onto its approved change requests.
//!
//! `sync` is safe to call any number of times, in any order, interleaved
//! with other calls. There is no "already synced" flag; convergence comes
//! purely from comparing current against desired state before writing, so
//! repeated runs against a fixed set of approved requests make no writes.
//!
//! Two independent passes run on every invocation:
//!
//! 1. The approved reschedule with the highest request id (later approvals
//!    win over earlier ones) is compared against the booking's schedule by
//!    calendar date, never by timestamp, so time-of-day or timezone
//!    representation cannot produce a false mismatch. It is pushed onto the
//!    booking when it differs.
//! 2. Every approved cancellation whose booking is not yet `Cancelled` sets
//!    the booking to `Cancelled`.

use chrono::{NaiveDate, NaiveTime};
use sqlx::PgConnection;
use tracing::{debug, instrument};

use crate::db::errors::Result;
use crate::db::handlers::{Bookings, Requests};
use crate::db::models::{bookings::Booking, requests::Request};
use crate::types::{BookingId, UserId};

/// Whether the approved reschedule disagrees with the booking's current
/// schedule. Dates compare by calendar day; the rent time only counts when
/// the request proposes one.
fn schedule_differs(
    current_start: NaiveDate,
    current_end: NaiveDate,
    current_time: Option<NaiveTime>,
    new_start: NaiveDate,
    new_end: NaiveDate,
    new_time: Option<NaiveTime>,
) -> bool {
    let dates_differ = current_start != new_start || current_end != new_end;
    let time_differs = match new_time {
        Some(t) => current_time != Some(t),
        None => false,
    };
    dates_differ || time_differs
}

/// Apply an approved reschedule request onto its booking if the schedules
/// disagree. Returns whether a write happened.
async fn apply_reschedule(db: &mut PgConnection, booking: &Booking, request: &Request) -> Result<bool> {
    // latest_approved_reschedule only returns rows with both dates present
    let (Some(new_start), Some(new_end)) = (request.new_start_date, request.new_end_date) else {
        return Ok(false);
    };

    if !schedule_differs(
        booking.start_date,
        booking.end_date,
        booking.rent_time,
        new_start,
        new_end,
        request.new_rent_time,
    ) {
        debug!(booking_id = booking.id, "booking schedule already matches approved reschedule");
        return Ok(false);
    }

    debug!(
        booking_id = booking.id,
        request_id = request.id,
        %new_start,
        %new_end,
        "pushing approved reschedule onto booking"
    );
    Bookings::new(db)
        .update_schedule(booking.id, new_start, new_end, request.new_rent_time)
        .await?;

    Ok(true)
}

/// Reconcile one booking with its approved requests. Returns whether any
/// write happened.
#[instrument(skip(db), err)]
pub async fn sync_booking(db: &mut PgConnection, booking_id: BookingId) -> Result<bool> {
    let Some(booking) = Bookings::new(db).get_by_id(booking_id).await? else {
        return Ok(false);
    };

    let mut changed = false;

    if let Some(reschedule) = Requests::new(db).latest_approved_reschedule(booking_id).await? {
        changed |= apply_reschedule(db, &booking, &reschedule).await?;
    }

    let has_approved_cancellation: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT id FROM requests
        WHERE booking_id = $1 AND request_type = 'cancellation' AND status = 'approved'
        LIMIT 1
        "#,
    )
    .bind(booking_id)
    .fetch_optional(&mut *db)
    .await?;

    if has_approved_cancellation.is_some() {
        changed |= Bookings::new(db).mark_cancelled(booking_id).await?;
    }

    Ok(changed)
}

/// Reconcile all of a user's bookings. Invoked opportunistically when the
/// user's bookings are listed, so drift introduced outside the API heals on
/// the next read. Returns the number of bookings that changed.
#[instrument(skip(db), err)]
pub async fn sync_user_bookings(db: &mut PgConnection, user_id: UserId) -> Result<u32> {
    let mut changed = 0;

    let bookings = Bookings::new(db).list_for_user(user_id).await?;
    for booking in &bookings {
        if let Some(reschedule) = Requests::new(db).latest_approved_reschedule(booking.id).await? {
            if apply_reschedule(db, booking, &reschedule).await? {
                changed += 1;
            }
        }
    }

    for booking_id in Requests::new(db).bookings_with_unapplied_cancellation(user_id).await? {
        if Bookings::new(db).mark_cancelled(booking_id).await? {
            changed += 1;
        }
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn equal_schedules_do_not_differ() {
        assert!(!schedule_differs(
            date(2025, 3, 10),
            date(2025, 3, 12),
            Some(time(9, 0)),
            date(2025, 3, 10),
            date(2025, 3, 12),
            Some(time(9, 0)),
        ));
    }

    #[test]
    fn changed_dates_differ() {
        assert!(schedule_differs(
            date(2025, 3, 10),
            date(2025, 3, 12),
            None,
            date(2025, 3, 11),
            date(2025, 3, 13),
            None,
        ));
    }

    #[test]
    fn missing_proposed_time_keeps_current_time() {
        // A reschedule without a proposed time never forces a write on its own.
        assert!(!schedule_differs(
            date(2025, 3, 10),
            date(2025, 3, 12),
            Some(time(9, 0)),
            date(2025, 3, 10),
            date(2025, 3, 12),
            None,
        ));
    }

    #[test]
    fn proposed_time_change_differs() {
        assert!(schedule_differs(
            date(2025, 3, 10),
            date(2025, 3, 12),
            Some(time(9, 0)),
            date(2025, 3, 10),
            date(2025, 3, 12),
            Some(time(14, 30)),
        ));
    }

    mod db {
        use super::{date, *};
        use crate::db::models::{
            bookings::BookingStatus,
            requests::{RequestStatus, RequestType},
        };
        use crate::test_utils::{seed_booking, seed_decided_request};
        use sqlx::PgPool;

        #[sqlx::test]
        #[test_log::test]
        async fn sync_is_a_noop_without_approved_requests(pool: PgPool) {
            let booking = seed_booking(&pool, 1, 1, 30).await;

            let mut conn = pool.acquire().await.unwrap();
            assert!(!sync_booking(&mut conn, booking.id).await.unwrap());

            let after = Bookings::new(&mut conn).get_by_id(booking.id).await.unwrap().unwrap();
            assert_eq!(after.start_date, booking.start_date);
            assert_eq!(after.end_date, booking.end_date);
            assert_eq!(after.status, BookingStatus::Pending);
        }

        #[sqlx::test]
        #[test_log::test]
        async fn rejected_requests_never_touch_the_booking(pool: PgPool) {
            let booking = seed_booking(&pool, 1, 1, 30).await;
            seed_decided_request(
                &pool,
                &booking,
                RequestType::Reschedule,
                RequestStatus::Rejected,
                Some(date(2099, 1, 1)),
                Some(date(2099, 1, 3)),
            )
            .await;

            let mut conn = pool.acquire().await.unwrap();
            assert!(!sync_booking(&mut conn, booking.id).await.unwrap());

            let after = Bookings::new(&mut conn).get_by_id(booking.id).await.unwrap().unwrap();
            assert_eq!(after.start_date, booking.start_date);
        }

        #[sqlx::test]
        #[test_log::test]
        async fn sync_converges_to_highest_id_approved_reschedule(pool: PgPool) {
            let booking = seed_booking(&pool, 1, 1, 30).await;
            seed_decided_request(
                &pool,
                &booking,
                RequestType::Reschedule,
                RequestStatus::Approved,
                Some(date(2099, 1, 1)),
                Some(date(2099, 1, 3)),
            )
            .await;
            // A second approval exists historically; the later one wins.
            seed_decided_request(
                &pool,
                &booking,
                RequestType::Reschedule,
                RequestStatus::Approved,
                Some(date(2099, 2, 1)),
                Some(date(2099, 2, 3)),
            )
            .await;

            let mut conn = pool.acquire().await.unwrap();
            assert!(sync_booking(&mut conn, booking.id).await.unwrap());

            let after = Bookings::new(&mut conn).get_by_id(booking.id).await.unwrap().unwrap();
            assert_eq!(after.start_date, date(2099, 2, 1));
            assert_eq!(after.end_date, date(2099, 2, 3));

            // Converged: repeated runs make no further writes, in any order.
            assert!(!sync_booking(&mut conn, booking.id).await.unwrap());
            assert!(!sync_booking(&mut conn, booking.id).await.unwrap());
        }

        #[sqlx::test]
        #[test_log::test]
        async fn approved_cancellation_cancels_booking_exactly_once(pool: PgPool) {
            let booking = seed_booking(&pool, 1, 1, 30).await;
            seed_decided_request(&pool, &booking, RequestType::Cancellation, RequestStatus::Approved, None, None).await;

            let mut conn = pool.acquire().await.unwrap();
            assert!(sync_booking(&mut conn, booking.id).await.unwrap());

            let after = Bookings::new(&mut conn).get_by_id(booking.id).await.unwrap().unwrap();
            assert_eq!(after.status, BookingStatus::Cancelled);

            assert!(!sync_booking(&mut conn, booking.id).await.unwrap());
        }

        #[sqlx::test]
        #[test_log::test]
        async fn sync_user_bookings_heals_drift_across_bookings(pool: PgPool) {
            let first = seed_booking(&pool, 7, 1, 30).await;
            let second = seed_booking(&pool, 7, 1, 60).await;
            seed_decided_request(
                &pool,
                &first,
                RequestType::Reschedule,
                RequestStatus::Approved,
                Some(date(2099, 3, 1)),
                Some(date(2099, 3, 3)),
            )
            .await;
            // Deciding through the repository alone skips the propagation the
            // API performs, leaving exactly the drift sync must heal.
            seed_decided_request(&pool, &second, RequestType::Cancellation, RequestStatus::Approved, None, None).await;

            let mut conn = pool.acquire().await.unwrap();
            let changed = sync_user_bookings(&mut conn, 7).await.unwrap();
            assert!(changed >= 1);

            let first_after = Bookings::new(&mut conn).get_by_id(first.id).await.unwrap().unwrap();
            assert_eq!(first_after.start_date, date(2099, 3, 1));
            let second_after = Bookings::new(&mut conn).get_by_id(second.id).await.unwrap().unwrap();
            assert_eq!(second_after.status, BookingStatus::Cancelled);

            assert_eq!(sync_user_bookings(&mut conn, 7).await.unwrap(), 0);
        }
    }
}
