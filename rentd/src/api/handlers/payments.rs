//! HTTP handlers for payment endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    api::models::payments::{CheckoutResponse, PaymentCreate, PaymentResponse, PaymentWithBookingResponse},
    auth::CurrentUser,
    db::{
        handlers::{Bookings, Payments},
        models::payments::{PaymentCreateDBRequest, PaymentStatus},
    },
    errors::{Error, Result},
    reconcile,
    types::BookingId,
};

/// Create a checkout session for a booking's down payment
#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    summary = "Create a checkout session",
    description = "Creates a gateway checkout session and records a pending payment. Checkout creation and \
                   the payment row are one unit: if the gateway call fails, nothing is persisted.",
    request_body = PaymentCreate,
    responses(
        (status = 201, description = "Checkout created", body = CheckoutResponse),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Booking not found or not owned by the caller"),
        (status = 502, description = "Gateway checkout creation failed"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(data): Json<PaymentCreate>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    if data.amount <= Decimal::ZERO {
        return Err(Error::Validation {
            message: "Amount is required and must be greater than 0".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let booking = Bookings::new(&mut conn)
        .get_owned(data.booking_id, user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Booking".to_string(),
            id: data.booking_id.to_string(),
        })?;

    // Gateway first: a failed checkout call must not leave a dangling
    // payment row.
    let checkout = state
        .gateway
        .create_checkout(data.amount, booking.id)
        .await
        .map_err(|e| Error::Upstream {
            operation: "create checkout session".to_string(),
            message: e.to_string(),
        })?;

    Payments::new(&mut conn)
        .create(&PaymentCreateDBRequest {
            booking_id: booking.id,
            amount: data.amount,
            checkout_url: checkout.checkout_url.clone(),
            payment_intent_id: checkout.payment_intent_id,
            source_id: Some(checkout.checkout_id),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            checkout_url: checkout.checkout_url,
        }),
    ))
}

/// Get (and reconcile) the payment status for a booking
#[utoipa::path(
    get,
    path = "/payments/status/{booking_id}",
    tag = "payments",
    summary = "Get payment status for a booking",
    description = "Returns the booking's latest payment. While the payment is pending and a payment intent \
                   is known, the gateway is queried directly and local state is reconciled before \
                   answering. A failed gateway call falls back to the last known local status.",
    params(("booking_id" = i64, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "The latest payment", body = PaymentResponse),
        (status = 404, description = "Booking or payment not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn payment_status(
    State(state): State<AppState>,
    Path(booking_id): Path<BookingId>,
    user: CurrentUser,
) -> Result<Json<PaymentResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    Bookings::new(&mut conn)
        .get_owned(booking_id, user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Booking".to_string(),
            id: booking_id.to_string(),
        })?;

    let payment = Payments::new(&mut conn)
        .latest_for_booking(booking_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Payment".to_string(),
            id: booking_id.to_string(),
        })?;
    drop(conn);

    if payment.status == PaymentStatus::Pending {
        if let Some(intent_id) = payment.payment_intent_id.clone() {
            match state.gateway.get_payment_intent(&intent_id).await {
                Ok(intent) => {
                    reconcile::apply_report(&state.db, state.gateway.as_ref(), &payment, intent.into()).await?;
                }
                Err(e) => {
                    // Transient upstream failure: answer from local state.
                    tracing::warn!(payment_id = payment.id, "gateway status check failed: {e}");
                }
            }
        }
    }

    // Re-read so the response reflects whatever reconciliation applied.
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn)
        .get_by_id(payment.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Payment".to_string(),
            id: payment.id.to_string(),
        })?;

    Ok(Json(PaymentResponse::from(payment)))
}

/// List all payments against the caller's bookings
#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    summary = "List my payments",
    responses(
        (status = 200, description = "Payments, newest first", body = Vec<PaymentWithBookingResponse>),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_payments(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<PaymentWithBookingResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let payments = Payments::new(&mut conn).list_for_user(user.id).await?;

    Ok(Json(payments.into_iter().map(PaymentWithBookingResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{DummyGatewayConfig, GatewayConfig, PaymongoConfig},
        db::models::bookings::BookingPaymentStatus,
        reconcile::transaction_reference,
        test_utils::*,
    };
    use serde_json::json;
    use sqlx::PgPool;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const USER: i64 = 1;
    const COMPANY: i64 = 10;

    fn processing_gateway() -> GatewayConfig {
        GatewayConfig::Dummy(DummyGatewayConfig {
            intent_status: "awaiting_payment_method".to_string(),
            source_type: None,
        })
    }

    async fn create_checkout(server: &axum_test::TestServer, booking_id: i64) -> CheckoutResponse {
        let response = server
            .post("/api/v1/payments")
            .add_header("authorization", bearer(USER))
            .json(&json!({ "booking_id": booking_id, "amount": "1500.00" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    fn paid_webhook_event(booking_id: i64) -> serde_json::Value {
        json!({
            "data": {
                "id": "evt_1",
                "attributes": {
                    "type": "payment.paid",
                    "data": {
                        "id": format!("pay_{booking_id}"),
                        "attributes": {
                            "payment_intent_id": format!("dummy_intent_{booking_id}"),
                            "source": { "type": "gcash" }
                        }
                    }
                }
            }
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn checkout_creates_a_pending_payment(pool: PgPool) {
        let (server, _state) = create_test_app_with_config(pool.clone(), test_config_with_gateway(processing_gateway()));
        let booking = seed_booking(&pool, USER, COMPANY, 30).await;

        let checkout = create_checkout(&server, booking.id).await;
        assert!(checkout.checkout_url.contains("checkout"));

        let status = server
            .get(&format!("/api/v1/payments/status/{}", booking.id))
            .add_header("authorization", bearer(USER))
            .await;
        status.assert_status_ok();
        let payment: PaymentResponse = status.json();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.payment_intent_id.as_deref(), Some(format!("dummy_intent_{}", booking.id).as_str()));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn checkout_rejects_nonpositive_amounts_and_foreign_bookings(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone());
        let booking = seed_booking(&pool, USER, COMPANY, 30).await;

        let zero = server
            .post("/api/v1/payments")
            .add_header("authorization", bearer(USER))
            .json(&json!({ "booking_id": booking.id, "amount": "0" }))
            .await;
        zero.assert_status(StatusCode::BAD_REQUEST);

        let foreign = server
            .post("/api/v1/payments")
            .add_header("authorization", bearer(USER + 1))
            .json(&json!({ "booking_id": booking.id, "amount": "1500.00" }))
            .await;
        foreign.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn failed_checkout_leaves_no_payment_row(pool: PgPool) {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checkout_sessions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&mock)
            .await;

        let config = test_config_with_gateway(GatewayConfig::Paymongo(PaymongoConfig {
            secret_key: "sk_test_bad".to_string(),
            api_url: mock.uri(),
            webhook_secret: None,
        }));
        let (server, _state) = create_test_app_with_config(pool.clone(), config);
        let booking = seed_booking(&pool, USER, COMPANY, 30).await;

        let response = server
            .post("/api/v1/payments")
            .add_header("authorization", bearer(USER))
            .json(&json!({ "booking_id": booking.id, "amount": "1500.00" }))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments WHERE booking_id = $1")
            .bind(booking.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn pull_reconciliation_confirms_payment_and_notifies_exactly_once(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone());
        let booking = seed_booking(&pool, USER, COMPANY, 30).await;
        create_checkout(&server, booking.id).await;

        let status = server
            .get(&format!("/api/v1/payments/status/{}", booking.id))
            .add_header("authorization", bearer(USER))
            .await;
        status.assert_status_ok();
        assert_eq!(status.json::<PaymentResponse>().status, PaymentStatus::Paid);

        let mut conn = pool.acquire().await.unwrap();
        let after = Bookings::new(&mut conn).get_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(after.payment_status, BookingPaymentStatus::Paid);
        assert_eq!(after.payment_method.as_deref(), Some("GCash"));
        assert_eq!(
            after.transaction_id.as_deref(),
            Some(transaction_reference(booking.id, chrono::Utc::now().date_naive()).as_str())
        );
        assert_eq!(
            after.reference_number.as_deref(),
            Some(format!("dummy_intent_{}", booking.id).as_str())
        );
        // Confirmation never approves: the lifecycle status is untouched.
        assert_eq!(after.status, crate::db::models::bookings::BookingStatus::Pending);
        drop(conn);

        // Reconciling again, through either path, produces no second message.
        server
            .get(&format!("/api/v1/payments/status/{}", booking.id))
            .add_header("authorization", bearer(USER))
            .await
            .assert_status_ok();
        server.post("/webhooks/payments").json(&paid_webhook_event(booking.id)).await.assert_status_ok();

        assert_eq!(count_notifications(&pool, USER, "booking_update").await, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn webhook_push_converges_to_the_same_state_as_pull(pool: PgPool) {
        // The gateway still reports the intent as processing, so only the
        // webhook can flip the payment.
        let (server, _state) = create_test_app_with_config(pool.clone(), test_config_with_gateway(processing_gateway()));
        let booking = seed_booking(&pool, USER, COMPANY, 30).await;
        create_checkout(&server, booking.id).await;

        server.post("/webhooks/payments").json(&paid_webhook_event(booking.id)).await.assert_status_ok();
        // Duplicate delivery is expected and harmless.
        server.post("/webhooks/payments").json(&paid_webhook_event(booking.id)).await.assert_status_ok();

        let status = server
            .get(&format!("/api/v1/payments/status/{}", booking.id))
            .add_header("authorization", bearer(USER))
            .await;
        assert_eq!(status.json::<PaymentResponse>().status, PaymentStatus::Paid);

        let mut conn = pool.acquire().await.unwrap();
        let after = Bookings::new(&mut conn).get_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(after.payment_status, BookingPaymentStatus::Paid);
        assert_eq!(after.payment_method.as_deref(), Some("GCash"));

        assert_eq!(count_notifications(&pool, USER, "booking_update").await, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn webhook_failure_marks_payment_failed_and_leaves_booking_alone(pool: PgPool) {
        let (server, _state) = create_test_app_with_config(pool.clone(), test_config_with_gateway(processing_gateway()));
        let booking = seed_booking(&pool, USER, COMPANY, 30).await;
        create_checkout(&server, booking.id).await;

        let event = json!({
            "data": {
                "attributes": {
                    "type": "payment.failed",
                    "data": {
                        "id": format!("pay_{}", booking.id),
                        "attributes": { "payment_intent_id": format!("dummy_intent_{}", booking.id) }
                    }
                }
            }
        });
        server.post("/webhooks/payments").json(&event).await.assert_status_ok();

        let status = server
            .get(&format!("/api/v1/payments/status/{}", booking.id))
            .add_header("authorization", bearer(USER))
            .await;
        assert_eq!(status.json::<PaymentResponse>().status, PaymentStatus::Failed);

        let mut conn = pool.acquire().await.unwrap();
        let after = Bookings::new(&mut conn).get_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(after.payment_status, BookingPaymentStatus::Unpaid);
        assert_eq!(count_notifications(&pool, USER, "booking_update").await, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn gateway_outage_falls_back_to_last_known_status(pool: PgPool) {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checkout_sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "id": "cs_123",
                    "attributes": {
                        "checkout_url": "https://checkout.example/cs_123",
                        "payment_intent": { "id": "pi_123" }
                    }
                }
            })))
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/payment_intents/pi_123"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&mock)
            .await;

        let config = test_config_with_gateway(GatewayConfig::Paymongo(PaymongoConfig {
            secret_key: "sk_test_abc".to_string(),
            api_url: mock.uri(),
            webhook_secret: None,
        }));
        let (server, _state) = create_test_app_with_config(pool.clone(), config);
        let booking = seed_booking(&pool, USER, COMPANY, 30).await;
        create_checkout(&server, booking.id).await;

        // The status read does not fail with the gateway down.
        let status = server
            .get(&format!("/api/v1/payments/status/{}", booking.id))
            .add_header("authorization", bearer(USER))
            .await;
        status.assert_status_ok();
        assert_eq!(status.json::<PaymentResponse>().status, PaymentStatus::Pending);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn paid_gateway_status_does_not_touch_non_pending_bookings(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone());
        let booking = seed_booking(&pool, USER, COMPANY, 30).await;
        create_checkout(&server, booking.id).await;
        set_booking_status(&pool, booking.id, "Active").await;

        let status = server
            .get(&format!("/api/v1/payments/status/{}", booking.id))
            .add_header("authorization", bearer(USER))
            .await;
        assert_eq!(status.json::<PaymentResponse>().status, PaymentStatus::Paid);

        let mut conn = pool.acquire().await.unwrap();
        let after = Bookings::new(&mut conn).get_by_id(booking.id).await.unwrap().unwrap();
        // The payment row is settled but the booking keeps its own state.
        assert_eq!(after.payment_status, BookingPaymentStatus::Unpaid);
        assert!(after.transaction_id.is_none());
        assert_eq!(count_notifications(&pool, USER, "booking_update").await, 0);
    }
}
