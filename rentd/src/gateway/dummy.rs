//! Dummy payment gateway implementation.
//!
//! Returns scripted results without touching the network. Useful for tests
//! and local development: the intent status it reports is configurable, so
//! both the success and failure reconciliation paths can be exercised.

use rust_decimal::Decimal;

use crate::config::DummyGatewayConfig;
use crate::gateway::{CheckoutSession, IntentStatus, PaymentGateway, PaymentIntent, Result, SourceInfo};
use crate::types::BookingId;

pub struct DummyGateway {
    config: DummyGatewayConfig,
}

impl DummyGateway {
    pub fn new(config: DummyGatewayConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for DummyGateway {
    async fn create_checkout(&self, _amount: Decimal, booking_id: BookingId) -> Result<CheckoutSession> {
        tracing::info!(booking_id, "dummy gateway created checkout session");

        Ok(CheckoutSession {
            checkout_url: format!("https://dummy.invalid/checkout/{booking_id}"),
            checkout_id: format!("dummy_checkout_{booking_id}"),
            payment_intent_id: Some(format!("dummy_intent_{booking_id}")),
        })
    }

    async fn get_payment_intent(&self, _payment_intent_id: &str) -> Result<PaymentIntent> {
        Ok(PaymentIntent {
            status: IntentStatus::parse(&self.config.intent_status),
            source_type: self.config.source_type.clone(),
            allowed_methods: vec!["gcash".to_string(), "grab_pay".to_string(), "paymaya".to_string()],
        })
    }

    async fn get_source(&self, _source_id: &str) -> Result<SourceInfo> {
        Ok(SourceInfo {
            source_type: self.config.source_type.clone(),
        })
    }
}
