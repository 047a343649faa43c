//! Payment gateway abstraction layer.
//!
//! This module defines the [`PaymentGateway`] trait which abstracts the
//! third-party payment provider financing booking down payments. The
//! production implementation talks to a PayMongo-style REST API; the dummy
//! implementation returns scripted results for tests and development.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::config::GatewayConfig;
use crate::types::BookingId;

pub mod dummy;
pub mod paymongo;

/// Create a payment gateway from configuration.
///
/// This is the single point where config becomes a provider instance; adding
/// a new provider means adding a match arm here.
pub fn create_gateway(config: &GatewayConfig, app_url: &str) -> Box<dyn PaymentGateway> {
    match config {
        GatewayConfig::Paymongo(cfg) => Box::new(paymongo::PaymongoGateway::new(cfg.clone(), app_url)),
        GatewayConfig::Dummy(cfg) => Box::new(dummy::DummyGateway::new(cfg.clone())),
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while talking to the payment gateway.
///
/// All of these are upstream failures: transient to the read paths (callers
/// fall back to last known local state) and fatal to checkout creation.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
}

/// A newly created hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// URL the customer is redirected to for payment
    pub checkout_url: String,
    /// Gateway-side checkout session identifier
    pub checkout_id: String,
    /// Payment-intent identifier, when the gateway creates one up front
    pub payment_intent_id: Option<String>,
}

/// Classification of a gateway payment-intent status for reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Payment completed; local state should transition to paid
    Succeeded,
    /// Payment definitively failed or was cancelled
    Failed,
    /// Still in flight; local state stays untouched
    Processing,
}

/// Payment-intent status vocabulary reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    AwaitingPaymentMethod,
    AwaitingNextAction,
    Processing,
    Succeeded,
    Paid,
    PaymentFailed,
    Canceled,
    Other(String),
}

impl IntentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "awaiting_payment_method" => IntentStatus::AwaitingPaymentMethod,
            "awaiting_next_action" => IntentStatus::AwaitingNextAction,
            "processing" => IntentStatus::Processing,
            "succeeded" => IntentStatus::Succeeded,
            "paid" => IntentStatus::Paid,
            "payment_failed" => IntentStatus::PaymentFailed,
            "canceled" => IntentStatus::Canceled,
            other => IntentStatus::Other(other.to_string()),
        }
    }

    /// How reconciliation should treat this status. Anything unrecognized is
    /// treated as still processing, never as a failure.
    pub fn outcome(&self) -> GatewayOutcome {
        match self {
            IntentStatus::Succeeded | IntentStatus::Paid => GatewayOutcome::Succeeded,
            IntentStatus::PaymentFailed | IntentStatus::Canceled => GatewayOutcome::Failed,
            IntentStatus::AwaitingPaymentMethod
            | IntentStatus::AwaitingNextAction
            | IntentStatus::Processing
            | IntentStatus::Other(_) => GatewayOutcome::Processing,
        }
    }
}

/// A gateway payment intent as seen by the reconciler.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub status: IntentStatus,
    /// Instrument type of the latest payment, when the gateway reports one
    pub source_type: Option<String>,
    /// Payment methods that were offered at checkout
    pub allowed_methods: Vec<String>,
}

/// A gateway payment source, used as the last resort of the payment-method
/// fallback chain.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source_type: Option<String>,
}

/// Abstract payment gateway interface.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for a booking's down payment.
    async fn create_checkout(&self, amount: Decimal, booking_id: BookingId) -> Result<CheckoutSession>;

    /// Fetch the current state of a payment intent.
    async fn get_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent>;

    /// Fetch a payment source by id.
    async fn get_source(&self, source_id: &str) -> Result<SourceInfo>;
}
