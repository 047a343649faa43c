//! # rentd: Booking Request & Payment Reconciliation backend
//!
//! `rentd` is the booking-lifecycle backend of a vehicle-rental marketplace:
//! customers create bookings, later request reschedules or cancellations,
//! companies approve or reject those requests, and a third-party payment
//! gateway finances a down payment per booking.
//!
//! ## Overview
//!
//! The interesting part of the system is the machinery between a change
//! request being filed and the booking record ending up in the right state,
//! with payments reconciled against the gateway and the customer notified
//! exactly once. Catalog browsing, file storage, and credential issuance are
//! external collaborators; this service consumes an authenticated user id
//! from a token-based identity verifier and talks to the gateway over HTTPS.
//!
//! ### Core Components
//!
//! The **request lifecycle** ([`api::handlers::requests`]) governs the
//! `pending → approved | rejected` state machine. At most one pending request
//! exists per booking, enforced by a create-time guard backed by a partial
//! unique index. Approval propagates onto the booking: reschedules through
//! the synchronizer, cancellations directly.
//!
//! The **fee engine** ([`fees`]) is a pure function over the company's
//! policy ([`db::handlers::policies`]) and the calendar distance to the
//! booking start. The preview endpoint and creation-time computation share
//! it, so the two agree for the same day.
//!
//! The **booking synchronizer** ([`sync`]) converges a booking's schedule
//! and status onto its approved requests. It compares calendar dates before
//! writing and can run any number of times, in any order; it is invoked on
//! approval and opportunistically whenever a user's bookings are listed.
//!
//! The **payment reconciler** ([`reconcile`]) brings local payment and
//! booking state in line with the gateway. Two triggers feed it the same
//! transition: a status query that polls the gateway (pull) and the webhook
//! receiver ([`api::handlers::webhooks`]) that accepts at-least-once,
//! unordered event delivery (push). The payment flip is conditional on the
//! row still being pending, and the confirmation notification is
//! deduplicated by key, so racing triggers converge.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for all persistence. The database
//! layer ([`db`]) follows the repository pattern; the gateway sits behind
//! the [`gateway::PaymentGateway`] trait with a PayMongo-style REST client
//! and a scripted dummy implementation for tests and development.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use rentd::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = rentd::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     rentd::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod fees;
pub mod gateway;
mod openapi;
pub mod reconcile;
pub mod sync;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{Router, http::HeaderValue, routing::{get, post, put}};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
use gateway::PaymentGateway;
pub use types::{BookingId, CompanyId, NotificationId, PaymentId, RequestId, UserId};

use bon::Builder;

/// Application state shared across all request handlers.
///
/// Holds the database pool, the loaded configuration, and the payment
/// gateway client.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub gateway: Arc<dyn PaymentGateway>,
}

/// Get the rentd database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    use axum::http::{Method, header};

    let wildcard = config.cors.allowed_origins.iter().any(|origin| origin == "*");

    let cors = if wildcard && !config.cors.allow_credentials {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if origin != "*" {
                origins.push(origin.parse::<HeaderValue>()?);
            }
        }
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(config.cors.allow_credentials)
    };

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Bookings
        .route(
            "/bookings",
            get(api::handlers::bookings::list_bookings).post(api::handlers::bookings::create_booking),
        )
        .route("/bookings/delete-multiple", post(api::handlers::bookings::delete_bookings))
        .route(
            "/bookings/{id}",
            get(api::handlers::bookings::get_booking).delete(api::handlers::bookings::delete_booking),
        )
        // Change requests
        .route(
            "/requests",
            get(api::handlers::requests::list_requests).post(api::handlers::requests::create_request),
        )
        .route("/requests/compute-fee", post(api::handlers::requests::compute_fee))
        .route("/requests/delete-multiple", post(api::handlers::requests::delete_requests))
        .route(
            "/requests/{id}",
            get(api::handlers::requests::get_request).delete(api::handlers::requests::delete_request),
        )
        .route("/requests/{id}/decision", put(api::handlers::requests::decide_request))
        // Payments
        .route(
            "/payments",
            get(api::handlers::payments::list_payments).post(api::handlers::payments::create_payment),
        )
        .route("/payments/status/{booking_id}", get(api::handlers::payments::payment_status))
        // Notifications
        .route("/notifications", get(api::handlers::notifications::list_notifications))
        .route("/notifications/unread-count", get(api::handlers::notifications::unread_count))
        .route("/notifications/read-all", put(api::handlers::notifications::mark_all_read))
        .route("/notifications/{id}/read", put(api::handlers::notifications::mark_read))
        // Company policies
        .route("/companies/{id}/policy", get(api::handlers::policies::get_policy))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        // Webhook route (external services, not part of the client API)
        .route("/webhooks/payments", post(api::handlers::webhooks::payment_webhook))
        .with_state(state.clone())
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", openapi::ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Build the payment gateway from configuration, defaulting to the dummy
/// gateway when none is configured.
fn setup_gateway(config: &Config) -> Arc<dyn PaymentGateway> {
    match &config.gateway {
        Some(gateway_config) => Arc::from(gateway::create_gateway(gateway_config, &config.app_url)),
        None => {
            warn!("no payment gateway configured, using the dummy gateway");
            Arc::new(gateway::dummy::DummyGateway::new(config::DummyGatewayConfig::default()))
        }
    }
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, and builds the router
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = PgPool::connect(config.database_url()?).await?;
        migrator().run(&pool).await?;

        let gateway = setup_gateway(&config);

        let state = AppState::builder().db(pool.clone()).config(config.clone()).gateway(gateway).build();
        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("rentd listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
