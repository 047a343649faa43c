//! Shared helpers for integration tests.

use chrono::{Duration, NaiveDate, Utc};
use jsonwebtoken::{EncodingKey, Header};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    AppState, build_router,
    auth::session::TokenClaims,
    config::{Config, DummyGatewayConfig, GatewayConfig},
    db::{
        handlers::{Bookings, Requests},
        models::{
            bookings::{Booking, BookingCreateDBRequest},
            requests::{Request, RequestCreateDBRequest, RequestStatus, RequestType},
        },
    },
    gateway,
    types::{BookingId, CompanyId, UserId},
};

pub const TEST_SECRET: &str = "test-secret-key";

/// Configuration for tests: dummy gateway reporting success via GCash.
pub fn test_config() -> Config {
    test_config_with_gateway(GatewayConfig::Dummy(DummyGatewayConfig::default()))
}

pub fn test_config_with_gateway(gateway: GatewayConfig) -> Config {
    Config {
        secret_key: Some(TEST_SECRET.to_string()),
        gateway: Some(gateway),
        ..Config::default()
    }
}

/// Mint a bearer token the way the external identity verifier would.
pub fn issue_token(user_id: UserId) -> String {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id,
        email: Some(format!("user{user_id}@example.com")),
        exp: (now + Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    };
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET.as_bytes()))
        .expect("failed to encode test token")
}

pub fn bearer(user_id: UserId) -> String {
    format!("Bearer {}", issue_token(user_id))
}

/// Build a test server over the full router with the given config.
pub fn create_test_app_with_config(pool: PgPool, config: Config) -> (axum_test::TestServer, AppState) {
    let gateway_config = config
        .gateway
        .clone()
        .unwrap_or(GatewayConfig::Dummy(DummyGatewayConfig::default()));
    let state = AppState::builder()
        .db(pool)
        .config(config.clone())
        .gateway(std::sync::Arc::from(gateway::create_gateway(&gateway_config, &config.app_url)))
        .build();
    let router = build_router(&state).expect("failed to build router");
    let server = axum_test::TestServer::new(router).expect("failed to create test server");
    (server, state)
}

pub fn create_test_app(pool: PgPool) -> (axum_test::TestServer, AppState) {
    create_test_app_with_config(pool, test_config())
}

/// A booking starting `days_out` days from today, owned by `user_id`.
pub async fn seed_booking(pool: &PgPool, user_id: UserId, company_id: CompanyId, days_out: i64) -> Booking {
    let start = Utc::now().date_naive() + Duration::days(days_out);
    seed_booking_with_dates(pool, user_id, company_id, start, start + Duration::days(2)).await
}

pub async fn seed_booking_with_dates(
    pool: &PgPool,
    user_id: UserId,
    company_id: CompanyId,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Booking {
    let mut conn = pool.acquire().await.expect("failed to acquire connection");
    Bookings::new(&mut conn)
        .create(&BookingCreateDBRequest {
            user_id,
            user_name: "Test User".to_string(),
            mobile_number: "09170000000".to_string(),
            vehicle_id: Some(1),
            vehicle_name: "Toyota Vios".to_string(),
            company_id,
            company_name: Some("Test Motors".to_string()),
            service_type: "Self-drive".to_string(),
            start_date,
            end_date,
            rent_time: None,
            destination: "Tagaytay".to_string(),
            occasion: None,
            message: None,
            valid_id_url: None,
            additional_id_url: None,
            total_cost: Some(Decimal::new(5000, 0)),
        })
        .await
        .expect("failed to seed booking")
}

pub async fn set_booking_status(pool: &PgPool, booking_id: BookingId, status: &str) {
    sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
        .bind(booking_id)
        .bind(status)
        .execute(pool)
        .await
        .expect("failed to set booking status");
}

/// Store a policy row for a company.
pub async fn seed_policy(
    pool: &PgPool,
    company_id: CompanyId,
    free_days: i32,
    reschedule_fee: Decimal,
    cancellation_fee: Decimal,
) {
    sqlx::query(
        r#"
        INSERT INTO company_policies (
            company_id, reschedule_terms, cancellation_terms, refund_terms,
            reschedule_free_days, reschedule_fee_percentage, cancellation_fee_percentage
        )
        VALUES ($1, 'reschedule terms', 'cancellation terms', 'refund terms', $2, $3, $4)
        "#,
    )
    .bind(company_id)
    .bind(free_days)
    .bind(reschedule_fee)
    .bind(cancellation_fee)
    .execute(pool)
    .await
    .expect("failed to seed policy");
}

/// An approved request against a booking, created and decided directly
/// through the repositories.
pub async fn seed_decided_request(
    pool: &PgPool,
    booking: &Booking,
    request_type: RequestType,
    status: RequestStatus,
    new_start_date: Option<NaiveDate>,
    new_end_date: Option<NaiveDate>,
) -> Request {
    let mut conn = pool.acquire().await.expect("failed to acquire connection");
    let mut repo = Requests::new(&mut conn);
    let request = repo
        .create(&RequestCreateDBRequest {
            user_id: booking.user_id,
            company_id: booking.company_id,
            booking_id: booking.id,
            request_type,
            reason: "Change of plans".to_string(),
            new_start_date,
            new_end_date,
            new_rent_time: None,
            computed_fee: Decimal::ZERO,
        })
        .await
        .expect("failed to seed request");
    repo.mark_decided(request.id, status, None, None)
        .await
        .expect("failed to decide seeded request");
    repo.get_by_id(request.id)
        .await
        .expect("failed to reload seeded request")
        .expect("seeded request missing")
}

/// Notifications of a kind recorded for a user.
pub async fn count_notifications(pool: &PgPool, user_id: UserId, kind: &str) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND type = $2")
            .bind(user_id)
            .bind(kind)
            .fetch_one(pool)
            .await
            .expect("failed to count notifications");
    count
}
