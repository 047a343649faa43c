//! PayMongo REST API client.
//!
//! The same endpoint serves test and live mode; which one applies is
//! determined by the secret key (`sk_test_` / `sk_live_`). Authentication is
//! HTTP Basic with the secret key as username and an empty password.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::config::PaymongoConfig;
use crate::gateway::{
    CheckoutSession, GatewayError, IntentStatus, PaymentGateway, PaymentIntent, Result, SourceInfo,
};
use crate::types::BookingId;

pub struct PaymongoGateway {
    client: reqwest::Client,
    config: PaymongoConfig,
    /// Base URL the customer is sent back to after checkout
    app_url: String,
}

impl PaymongoGateway {
    pub fn new(config: PaymongoConfig, app_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Basic {}", BASE64_STANDARD.encode(format!("{}:", self.config.secret_key)))
    }

    async fn check_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

// Response envelope shared by all PayMongo endpoints
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionData {
    id: String,
    attributes: CheckoutSessionAttributes,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionAttributes {
    checkout_url: Option<String>,
    payment_intent: Option<PaymentIntentRef>,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentData {
    attributes: PaymentIntentAttributes,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentAttributes {
    status: String,
    latest_payment: Option<LatestPayment>,
    #[serde(default)]
    payment_method_allowed: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LatestPayment {
    attributes: Option<LatestPaymentAttributes>,
}

#[derive(Debug, Deserialize)]
struct LatestPaymentAttributes {
    source: Option<SourceRef>,
}

#[derive(Debug, Deserialize)]
struct SourceRef {
    #[serde(rename = "type")]
    source_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceData {
    attributes: Option<SourceRef>,
}

#[async_trait::async_trait]
impl PaymentGateway for PaymongoGateway {
    #[instrument(skip(self), err)]
    async fn create_checkout(&self, amount: Decimal, booking_id: BookingId) -> Result<CheckoutSession> {
        // PayMongo transacts in the smallest currency unit
        let amount_in_centavos = (amount * Decimal::new(100, 0))
            .round()
            .to_i64()
            .ok_or_else(|| GatewayError::InvalidResponse(format!("amount {amount} out of range")))?;

        let body = json!({
            "data": {
                "attributes": {
                    "send_email_receipt": true,
                    "show_description": true,
                    "show_line_items": true,
                    "line_items": [{
                        "currency": "PHP",
                        "amount": amount_in_centavos,
                        "name": format!("Vehicle Rental - Booking #{booking_id}"),
                        "quantity": 1,
                        "description": format!("Down payment for vehicle rental booking #{booking_id}"),
                    }],
                    "payment_method_types": ["gcash", "grab_pay", "paymaya"],
                    "success_url": format!("{}/payment/success?booking_id={booking_id}", self.app_url),
                    "cancel_url": format!("{}/payment/cancel?booking_id={booking_id}", self.app_url),
                    "description": format!("Vehicle Rental Payment - Booking #{booking_id}"),
                    "metadata": { "booking_id": booking_id.to_string() },
                }
            }
        });

        let response = self
            .client
            .post(format!("{}/checkout_sessions", self.config.api_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await?;
        let response = self.check_response(response).await?;

        let envelope: ApiEnvelope<CheckoutSessionData> = response.json().await?;
        let checkout_url = envelope
            .data
            .attributes
            .checkout_url
            .ok_or_else(|| GatewayError::InvalidResponse("checkout session missing checkout_url".to_string()))?;

        tracing::info!(booking_id, checkout_id = %envelope.data.id, "created gateway checkout session");

        Ok(CheckoutSession {
            checkout_url,
            checkout_id: envelope.data.id,
            payment_intent_id: envelope.data.attributes.payment_intent.map(|intent| intent.id),
        })
    }

    #[instrument(skip(self), err)]
    async fn get_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent> {
        let response = self
            .client
            .get(format!("{}/payment_intents/{payment_intent_id}", self.config.api_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;
        let response = self.check_response(response).await?;

        let envelope: ApiEnvelope<PaymentIntentData> = response.json().await?;
        let attributes = envelope.data.attributes;

        let source_type = attributes
            .latest_payment
            .and_then(|payment| payment.attributes)
            .and_then(|attrs| attrs.source)
            .and_then(|source| source.source_type);

        Ok(PaymentIntent {
            status: IntentStatus::parse(&attributes.status),
            source_type,
            allowed_methods: attributes.payment_method_allowed,
        })
    }

    #[instrument(skip(self), err)]
    async fn get_source(&self, source_id: &str) -> Result<SourceInfo> {
        let response = self
            .client
            .get(format!("{}/sources/{source_id}", self.config.api_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;
        let response = self.check_response(response).await?;

        let envelope: ApiEnvelope<SourceData> = response.json().await?;

        Ok(SourceInfo {
            source_type: envelope.data.attributes.and_then(|attrs| attrs.source_type),
        })
    }
}
