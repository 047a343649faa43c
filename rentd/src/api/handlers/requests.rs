//! HTTP handlers for the change request lifecycle.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    AppState,
    api::models::requests::{
        ComputeFeeRequest, ComputeFeeResponse, DecisionRequest, DeleteManyResponse, RequestCreate, RequestDeleteMany,
        RequestResponse,
    },
    auth::CurrentUser,
    db::{
        handlers::{Bookings, Notifications, Policies, Requests},
        models::{
            bookings::BookingStatus,
            notifications::{NotificationCreateDBRequest, NotificationKind},
            requests::{Decision, RequestCreateDBRequest, RequestStatus, RequestType},
        },
    },
    errors::{Error, Result},
    fees, sync,
    types::RequestId,
};

fn parse_request_type(raw: &str) -> Result<RequestType> {
    match raw {
        "reschedule" => Ok(RequestType::Reschedule),
        "cancellation" => Ok(RequestType::Cancellation),
        _ => Err(Error::Validation {
            message: "Invalid request_type. Must be \"reschedule\" or \"cancellation\"".to_string(),
        }),
    }
}

fn parse_decision(raw: &str) -> Result<Decision> {
    match raw {
        "approved" => Ok(Decision::Approved),
        "rejected" => Ok(Decision::Rejected),
        _ => Err(Error::Validation {
            message: "Status must be \"approved\" or \"rejected\"".to_string(),
        }),
    }
}

/// Create a new reschedule or cancellation request
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    summary = "Create a change request",
    description = "Creates a pending reschedule or cancellation request against one of the caller's bookings. \
                   The fee is computed from the company's policy at creation time.",
    request_body = RequestCreate,
    responses(
        (status = 201, description = "Request created", body = RequestResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 404, description = "Booking not found or not owned by the caller"),
        (status = 409, description = "Booking not eligible, or a pending request already exists"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(data): Json<RequestCreate>,
) -> Result<(StatusCode, Json<RequestResponse>)> {
    let request_type = parse_request_type(&data.request_type)?;

    if data.reason.trim().is_empty() {
        return Err(Error::Validation {
            message: "Missing required fields: booking_id, request_type, and reason are required".to_string(),
        });
    }

    if request_type == RequestType::Reschedule && (data.new_start_date.is_none() || data.new_end_date.is_none()) {
        return Err(Error::Validation {
            message: "new_start_date and new_end_date are required for reschedule requests".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let booking = Bookings::new(&mut tx)
        .get_owned(data.booking_id, user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Booking".to_string(),
            id: data.booking_id.to_string(),
        })?;

    if matches!(booking.status, BookingStatus::Cancelled | BookingStatus::Completed) {
        return Err(Error::InvalidState {
            message: "Cannot create request for cancelled or completed bookings".to_string(),
            offending_ids: None,
        });
    }

    if Requests::new(&mut tx).has_pending_for_booking(booking.id).await? {
        return Err(Error::Conflict {
            message: "There is already a pending request for this booking".to_string(),
        });
    }

    let policy = Policies::new(&mut tx).resolve(booking.company_id).await?;
    let quote = fees::quote(request_type, &policy, booking.start_date, Utc::now().date_naive());

    let db_request = RequestCreateDBRequest {
        user_id: user.id,
        company_id: booking.company_id,
        booking_id: booking.id,
        request_type,
        reason: data.reason,
        new_start_date: data.new_start_date,
        new_end_date: data.new_end_date,
        new_rent_time: data.new_rent_time,
        computed_fee: quote.fee,
    };

    // The partial unique index backs up the pending check above against a
    // concurrent create racing between the check and this insert.
    let created = match Requests::new(&mut tx).create(&db_request).await {
        Ok(request) => request,
        Err(e) if e.is_pending_request_conflict() => {
            return Err(Error::Conflict {
                message: "There is already a pending request for this booking".to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let kind_word = match request_type {
        RequestType::Reschedule => "reschedule",
        RequestType::Cancellation => "cancellation",
    };
    Notifications::new(&mut tx)
        .create(&NotificationCreateDBRequest {
            user_id: user.id,
            message: format!(
                "Your {kind_word} request for booking #{} has been submitted and is pending approval.",
                booking.id
            ),
            kind: NotificationKind::RequestUpdate,
            related_request_id: Some(created.id),
            related_booking_id: Some(booking.id),
            dedup_key: None,
        })
        .await?;

    let enriched = Requests::new(&mut tx)
        .get_enriched(created.id)
        .await?
        .ok_or_else(|| Error::Internal {
            operation: format!("retrieve created request {}", created.id),
        })?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(RequestResponse::from(enriched))))
}

/// Preview the fee for a request before submitting it
#[utoipa::path(
    post,
    path = "/requests/compute-fee",
    tag = "requests",
    summary = "Preview the fee for a request",
    description = "Computes the fee a request would carry without creating anything. For the same booking, \
                   policy, and day this returns exactly the fee that creation would store.",
    request_body = ComputeFeeRequest,
    responses(
        (status = 200, description = "Fee preview", body = ComputeFeeResponse),
        (status = 400, description = "Invalid request type"),
        (status = 404, description = "Booking not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn compute_fee(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(data): Json<ComputeFeeRequest>,
) -> Result<Json<ComputeFeeResponse>> {
    let request_type = parse_request_type(&data.request_type)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let booking = Bookings::new(&mut conn)
        .get_owned(data.booking_id, user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Booking".to_string(),
            id: data.booking_id.to_string(),
        })?;

    let mut policies = Policies::new(&mut conn);
    let policy_applied = policies.exists(booking.company_id).await?;
    let policy = policies.resolve(booking.company_id).await?;

    let quote = fees::quote(request_type, &policy, booking.start_date, Utc::now().date_naive());

    Ok(Json(ComputeFeeResponse {
        computed_fee: quote.fee,
        fee_details: quote,
        policy_applied,
    }))
}

/// List the caller's requests
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    summary = "List my requests",
    responses(
        (status = 200, description = "The caller's requests, newest first", body = Vec<RequestResponse>),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_requests(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<RequestResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let requests = Requests::new(&mut conn).list_enriched_for_user(user.id).await?;

    Ok(Json(requests.into_iter().map(RequestResponse::from).collect()))
}

/// Get one of the caller's requests
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    summary = "Get a request",
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 200, description = "The request", body = RequestResponse),
        (status = 404, description = "Request not found or not owned by the caller"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
    user: CurrentUser,
) -> Result<Json<RequestResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let request = Requests::new(&mut conn)
        .get_enriched_owned(id, user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Request".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(RequestResponse::from(request)))
}

/// Approve or reject a pending request (company endpoint)
#[utoipa::path(
    put,
    path = "/requests/{id}/decision",
    tag = "requests",
    summary = "Decide a pending request",
    description = "Approves or rejects a pending request. Approval of a reschedule pushes the proposed \
                   schedule onto the booking; approval of a cancellation cancels the booking. Both \
                   decisions notify the requesting user. Deciding an already-decided request fails.",
    params(("id" = i64, Path, description = "Request ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Updated request", body = RequestResponse),
        (status = 400, description = "Invalid decision"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not pending"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn decide_request(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
    _user: CurrentUser,
    Json(data): Json<DecisionRequest>,
) -> Result<Json<RequestResponse>> {
    let decision = parse_decision(&data.status)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let request = Requests::new(&mut tx).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Request".to_string(),
        id: id.to_string(),
    })?;

    // Conditional flip: the affected-row count tells a lost race or repeated
    // decision apart from success without a second read.
    let flipped = Requests::new(&mut tx)
        .mark_decided(
            id,
            RequestStatus::from(decision),
            data.company_response.as_deref(),
            data.company_remark.as_deref(),
        )
        .await?;
    if !flipped {
        return Err(Error::InvalidState {
            message: "Request is not pending".to_string(),
            offending_ids: None,
        });
    }

    if decision == Decision::Approved {
        match request.request_type {
            // The synchronizer applies the approved schedule; its
            // compare-before-write makes the propagation idempotent even
            // though the decision itself is not repeatable.
            RequestType::Reschedule => {
                sync::sync_booking(&mut tx, request.booking_id).await?;
            }
            RequestType::Cancellation => {
                Bookings::new(&mut tx).mark_cancelled(request.booking_id).await?;
            }
        }
    }

    let kind_word = match request.request_type {
        RequestType::Reschedule => "reschedule",
        RequestType::Cancellation => "cancellation",
    };
    let decision_word = match decision {
        Decision::Approved => "approved",
        Decision::Rejected => "rejected",
    };
    let response_suffix = data.company_response.as_deref().unwrap_or("");
    Notifications::new(&mut tx)
        .create(&NotificationCreateDBRequest {
            user_id: request.user_id,
            message: format!(
                "Your {kind_word} request for booking #{} has been {decision_word}. {response_suffix}",
                request.booking_id
            ),
            kind: NotificationKind::RequestUpdate,
            related_request_id: Some(request.id),
            related_booking_id: Some(request.booking_id),
            dedup_key: None,
        })
        .await?;

    let enriched = Requests::new(&mut tx).get_enriched(id).await?.ok_or_else(|| Error::Internal {
        operation: format!("retrieve updated request {id}"),
    })?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(RequestResponse::from(enriched)))
}

/// Delete a resolved request
#[utoipa::path(
    delete,
    path = "/requests/{id}",
    tag = "requests",
    summary = "Delete a resolved request",
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request deleted"),
        (status = 404, description = "Request not found or not owned by the caller"),
        (status = 409, description = "Request is still pending"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_request(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let request = Requests::new(&mut conn)
        .get_owned(id, user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Request".to_string(),
            id: id.to_string(),
        })?;

    if request.status == RequestStatus::Pending {
        return Err(Error::InvalidState {
            message: "Cannot delete pending requests. Please wait for a response.".to_string(),
            offending_ids: None,
        });
    }

    Requests::new(&mut conn).delete(id).await?;

    Ok(Json(serde_json::json!({ "message": "Request deleted successfully" })))
}

/// Delete several resolved requests at once
#[utoipa::path(
    post,
    path = "/requests/delete-multiple",
    tag = "requests",
    summary = "Delete multiple resolved requests",
    description = "Deletes every given request, or nothing at all: if any entry is still pending the whole \
                   batch fails and the offending ids are reported.",
    request_body = RequestDeleteMany,
    responses(
        (status = 200, description = "Requests deleted", body = DeleteManyResponse),
        (status = 400, description = "Empty id list"),
        (status = 404, description = "No requests found"),
        (status = 409, description = "Some requests are still pending"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_requests(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(data): Json<RequestDeleteMany>,
) -> Result<Json<DeleteManyResponse>> {
    if data.request_ids.is_empty() {
        return Err(Error::Validation {
            message: "request_ids array is required".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let found = Requests::new(&mut tx).statuses_for_ids(&data.request_ids, user.id).await?;
    if found.is_empty() {
        return Err(Error::NotFound {
            resource: "Requests".to_string(),
            id: "batch".to_string(),
        });
    }

    let pending_ids: Vec<_> = found
        .iter()
        .filter(|(_, status)| *status == RequestStatus::Pending)
        .map(|(id, _)| *id)
        .collect();
    if !pending_ids.is_empty() {
        return Err(Error::InvalidState {
            message: "Cannot delete pending requests. Please wait for a response.".to_string(),
            offending_ids: Some(pending_ids),
        });
    }

    let valid_ids: Vec<_> = found.iter().map(|(id, _)| *id).collect();
    let deleted_count = Requests::new(&mut tx).delete_many(&valid_ids).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(DeleteManyResponse {
        message: format!("{deleted_count} request(s) deleted successfully"),
        deleted_count,
    }))
}
