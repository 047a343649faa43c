//! HTTP handlers for booking endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::bookings::{BookingCreate, BookingDeleteMany, BookingResponse},
    api::models::requests::DeleteManyResponse,
    auth::CurrentUser,
    db::{
        handlers::Bookings,
        models::bookings::{BookingCreateDBRequest, BookingStatus},
    },
    errors::{Error, Result},
    sync,
    types::BookingId,
};

/// Maximum number of bookings a user may accumulate.
const MAX_BOOKINGS_PER_USER: i64 = 3;

/// Create a new booking
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    summary = "Create a booking",
    description = "Creates a booking in Pending status. A user may only have one pending or active booking \
                   at a time, and at most three bookings in total.",
    request_body = BookingCreate,
    responses(
        (status = 201, description = "Booking created", body = BookingResponse),
        (status = 400, description = "Missing required fields or booking limit reached"),
        (status = 409, description = "A pending or active booking already exists"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(data): Json<BookingCreate>,
) -> Result<(StatusCode, Json<BookingResponse>)> {
    for (field, value) in [
        ("full_name", &data.full_name),
        ("mobile_number", &data.mobile_number),
        ("vehicle_name", &data.vehicle_name),
        ("service_type", &data.service_type),
        ("destination", &data.destination),
    ] {
        if value.trim().is_empty() {
            return Err(Error::Validation {
                message: format!("Missing required field: {field}"),
            });
        }
    }

    if data.end_date < data.start_date {
        return Err(Error::Validation {
            message: "end_date must not be before start_date".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    if Bookings::new(&mut tx).has_open_booking(user.id).await? {
        return Err(Error::Conflict {
            message: "You already have a pending or ongoing booking. Please complete or cancel it \
                      before making a new booking."
                .to_string(),
        });
    }

    if Bookings::new(&mut tx).count_for_user(user.id).await? >= MAX_BOOKINGS_PER_USER {
        return Err(Error::Validation {
            message: format!(
                "You have reached the maximum limit of {MAX_BOOKINGS_PER_USER} rentals. Please contact \
                 support if you need to make additional bookings."
            ),
        });
    }

    let booking = Bookings::new(&mut tx)
        .create(&BookingCreateDBRequest {
            user_id: user.id,
            user_name: data.full_name,
            mobile_number: data.mobile_number,
            vehicle_id: data.vehicle_id,
            vehicle_name: data.vehicle_name,
            company_id: data.company_id,
            company_name: data.company_name,
            service_type: data.service_type,
            start_date: data.start_date,
            end_date: data.end_date,
            rent_time: data.rent_time,
            destination: data.destination,
            occasion: data.occasion,
            message: data.message,
            valid_id_url: data.valid_id_url,
            additional_id_url: data.additional_id_url,
            total_cost: data.total_cost,
        })
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
}

/// List the caller's bookings
#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    summary = "List my bookings",
    description = "Returns the caller's bookings, newest first. Approved reschedules and cancellations are \
                   synchronized onto the bookings before the list is read, so drift introduced outside the \
                   API heals here.",
    responses(
        (status = 200, description = "The caller's bookings", body = Vec<BookingResponse>),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_bookings(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<BookingResponse>>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let synced = sync::sync_user_bookings(&mut tx, user.id).await?;
    if synced > 0 {
        tracing::info!(user_id = user.id, synced, "synchronized bookings with approved requests");
    }

    let bookings = Bookings::new(&mut tx).list_for_user(user.id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

/// Get one of the caller's bookings
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    summary = "Get a booking",
    params(("id" = i64, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "The booking", body = BookingResponse),
        (status = 404, description = "Booking not found or not owned by the caller"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<BookingId>,
    user: CurrentUser,
) -> Result<Json<BookingResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let booking = Bookings::new(&mut conn)
        .get_owned(id, user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Booking".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(BookingResponse::from(booking)))
}

/// Delete a cancelled booking
#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    tag = "bookings",
    summary = "Delete a cancelled booking",
    params(("id" = i64, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking deleted"),
        (status = 404, description = "Booking not found or not owned by the caller"),
        (status = 409, description = "Booking is not cancelled"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<BookingId>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let booking = Bookings::new(&mut conn)
        .get_owned(id, user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Booking".to_string(),
            id: id.to_string(),
        })?;

    if booking.status != BookingStatus::Cancelled {
        return Err(Error::InvalidState {
            message: "Only cancelled bookings can be deleted".to_string(),
            offending_ids: None,
        });
    }

    Bookings::new(&mut conn).delete(id).await?;

    Ok(Json(serde_json::json!({ "message": "Booking deleted successfully" })))
}

/// Delete several cancelled bookings at once
#[utoipa::path(
    post,
    path = "/bookings/delete-multiple",
    tag = "bookings",
    summary = "Delete multiple cancelled bookings",
    description = "Deletes every given booking, or nothing at all: if any entry is not cancelled the whole \
                   batch fails and the offending ids are reported.",
    request_body = BookingDeleteMany,
    responses(
        (status = 200, description = "Bookings deleted", body = DeleteManyResponse),
        (status = 400, description = "Empty id list"),
        (status = 404, description = "No bookings found"),
        (status = 409, description = "Some bookings are not cancelled"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_bookings(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(data): Json<BookingDeleteMany>,
) -> Result<Json<DeleteManyResponse>> {
    if data.booking_ids.is_empty() {
        return Err(Error::Validation {
            message: "booking_ids array is required".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let found = Bookings::new(&mut tx).statuses_for_ids(&data.booking_ids, user.id).await?;
    if found.is_empty() {
        return Err(Error::NotFound {
            resource: "Bookings".to_string(),
            id: "batch".to_string(),
        });
    }

    let not_cancelled: Vec<_> = found
        .iter()
        .filter(|(_, status)| *status != BookingStatus::Cancelled)
        .map(|(id, _)| *id)
        .collect();
    if !not_cancelled.is_empty() {
        return Err(Error::InvalidState {
            message: "Only cancelled bookings can be deleted".to_string(),
            offending_ids: Some(not_cancelled),
        });
    }

    let valid_ids: Vec<_> = found.iter().map(|(id, _)| *id).collect();
    let deleted_count = Bookings::new(&mut tx).delete_many(&valid_ids).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(DeleteManyResponse {
        message: format!("{deleted_count} booking(s) deleted successfully"),
        deleted_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::models::requests::{RequestStatus, RequestType},
        test_utils::*,
    };
    use serde_json::json;
    use sqlx::PgPool;

    const USER: i64 = 1;
    const COMPANY: i64 = 10;

    fn booking_payload() -> serde_json::Value {
        json!({
            "full_name": "Test User",
            "mobile_number": "09170000000",
            "vehicle_name": "Toyota Vios",
            "company_id": COMPANY,
            "service_type": "Self-drive",
            "start_date": "2099-06-01",
            "end_date": "2099-06-03",
            "destination": "Tagaytay"
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn a_second_open_booking_is_rejected(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone());

        let first = server
            .post("/api/v1/bookings")
            .add_header("authorization", bearer(USER))
            .json(&booking_payload())
            .await;
        first.assert_status(StatusCode::CREATED);
        let first: BookingResponse = first.json();
        assert_eq!(first.status, BookingStatus::Pending);

        let second = server
            .post("/api/v1/bookings")
            .add_header("authorization", bearer(USER))
            .json(&booking_payload())
            .await;
        second.assert_status(StatusCode::CONFLICT);

        // Cancelling the first frees the slot, up to the overall limit.
        set_booking_status(&pool, first.id, "Cancelled").await;
        server
            .post("/api/v1/bookings")
            .add_header("authorization", bearer(USER))
            .json(&booking_payload())
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn the_total_booking_limit_is_enforced(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone());

        for _ in 0..3 {
            let created = server
                .post("/api/v1/bookings")
                .add_header("authorization", bearer(USER))
                .json(&booking_payload())
                .await;
            created.assert_status(StatusCode::CREATED);
            set_booking_status(&pool, created.json::<BookingResponse>().id, "Cancelled").await;
        }

        let fourth = server
            .post("/api/v1/bookings")
            .add_header("authorization", bearer(USER))
            .json(&booking_payload())
            .await;
        fourth.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn listing_bookings_heals_unapplied_approvals(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone());
        let booking = seed_booking(&pool, USER, COMPANY, 30).await;
        // Approved outside the API: the booking row still has the old dates.
        seed_decided_request(
            &pool,
            &booking,
            RequestType::Reschedule,
            RequestStatus::Approved,
            Some(chrono::NaiveDate::from_ymd_opt(2099, 4, 1).unwrap()),
            Some(chrono::NaiveDate::from_ymd_opt(2099, 4, 3).unwrap()),
        )
        .await;

        let listed = server.get("/api/v1/bookings").add_header("authorization", bearer(USER)).await;
        listed.assert_status_ok();
        let listed: Vec<BookingResponse> = listed.json();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].start_date.to_string(), "2099-04-01");
        assert_eq!(listed[0].end_date.to_string(), "2099-04-03");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn only_cancelled_bookings_can_be_deleted(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone());
        let booking = seed_booking(&pool, USER, COMPANY, 30).await;

        let blocked = server
            .delete(&format!("/api/v1/bookings/{}", booking.id))
            .add_header("authorization", bearer(USER))
            .await;
        blocked.assert_status(StatusCode::CONFLICT);

        set_booking_status(&pool, booking.id, "Cancelled").await;
        server
            .delete(&format!("/api/v1/bookings/{}", booking.id))
            .add_header("authorization", bearer(USER))
            .await
            .assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn bulk_delete_reports_bookings_that_are_not_cancelled(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone());
        let cancelled = seed_booking(&pool, USER, COMPANY, 30).await;
        set_booking_status(&pool, cancelled.id, "Cancelled").await;
        let active = seed_booking(&pool, USER, COMPANY, 60).await;

        let blocked = server
            .post("/api/v1/bookings/delete-multiple")
            .add_header("authorization", bearer(USER))
            .json(&json!({ "booking_ids": [cancelled.id, active.id] }))
            .await;
        blocked.assert_status(StatusCode::CONFLICT);
        assert_eq!(blocked.json::<serde_json::Value>()["offending_ids"], json!([active.id]));
    }
}
