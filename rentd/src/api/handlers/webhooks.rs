//! Webhook receiver for asynchronous payment gateway events.
//!
//! The gateway delivers `payment.paid`, `payment.failed`, and
//! `checkout_session.completed` events at least once, with no ordering
//! guarantee relative to the pull reconciliation path. Event handling feeds
//! the same transition as the pull path ([`crate::reconcile`]), so both
//! converge to the same state regardless of arrival order or duplicates.

use axum::{
    body::Body,
    extract::{FromRequest, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::{
    AppState,
    config::GatewayConfig,
    db::handlers::Payments,
    gateway::GatewayOutcome,
    reconcile::{self, GatewayReport},
};

type HmacSha256 = Hmac<Sha256>;

/// A validated, flattened gateway webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Event type (e.g. "payment.paid")
    pub event_type: String,
    /// Gateway id of the resource the event is about
    pub resource_id: Option<String>,
    /// Payment intent the event refers to
    pub payment_intent_id: Option<String>,
    /// Instrument type reported with the payment
    pub source_type: Option<String>,
}

// The gateway's event envelope: data.attributes.type names the event and
// data.attributes.data carries the affected resource.
#[derive(Debug, Deserialize)]
struct Envelope {
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    attributes: EnvelopeAttributes,
}

#[derive(Debug, Deserialize)]
struct EnvelopeAttributes {
    #[serde(rename = "type")]
    event_type: String,
    data: Option<ResourceData>,
}

#[derive(Debug, Deserialize)]
struct ResourceData {
    id: Option<String>,
    attributes: Option<ResourceAttributes>,
}

#[derive(Debug, Deserialize)]
struct ResourceAttributes {
    payment_intent_id: Option<String>,
    source: Option<SourceRef>,
}

#[derive(Debug, Deserialize)]
struct SourceRef {
    #[serde(rename = "type")]
    source_type: Option<String>,
}

/// Parse the raw webhook payload into a flattened event.
fn parse_event(payload: &str) -> Result<WebhookEvent, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(payload)?;
    let attributes = envelope.data.attributes;
    let resource = attributes.data;

    let (resource_id, resource_attributes) = match resource {
        Some(resource) => (resource.id, resource.attributes),
        None => (None, None),
    };
    let (payment_intent_id, source_type) = match resource_attributes {
        Some(attrs) => (attrs.payment_intent_id, attrs.source.and_then(|s| s.source_type)),
        None => (None, None),
    };

    Ok(WebhookEvent {
        event_type: attributes.event_type,
        resource_id,
        payment_intent_id,
        source_type,
    })
}

/// Verify the gateway's webhook signature header.
///
/// The header carries `t=<timestamp>,te=<test signature>,li=<live signature>`;
/// the signature is hex-encoded HMAC-SHA256 over `{timestamp}.{payload}`.
/// Test and live mode share the header format, so either signature slot may
/// match.
fn verify_signature(header: &str, payload: &str, secret: &str) -> bool {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value.to_string()),
            Some(("te", value)) | Some(("li", value)) => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    if signatures.is_empty() {
        return false;
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    let expected = hex_encode(&mac.finalize().into_bytes());

    signatures.iter().any(|sig| constant_time_eq(sig.as_bytes(), expected.as_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// GatewayEvent extractor that verifies webhook signatures when a webhook
/// secret is configured.
pub struct GatewayEvent(pub WebhookEvent);

impl FromRequest<AppState> for GatewayEvent {
    type Rejection = Response;

    async fn from_request(req: Request<Body>, state: &AppState) -> Result<Self, Self::Rejection> {
        let signature = req
            .headers()
            .get("paymongo-signature")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let payload = String::from_request(req, state).await.map_err(IntoResponse::into_response)?;

        // Signature verification only applies when the gateway has a secret
        // configured; the dummy gateway delivers unsigned events.
        if let Some(GatewayConfig::Paymongo(config)) = &state.config.gateway {
            if let Some(secret) = &config.webhook_secret {
                let Some(signature) = signature else {
                    tracing::warn!("webhook rejected: missing signature header");
                    return Err(StatusCode::BAD_REQUEST.into_response());
                };
                if !verify_signature(&signature, &payload, secret) {
                    tracing::warn!("webhook rejected: signature verification failed");
                    return Err(StatusCode::BAD_REQUEST.into_response());
                }
            }
        }

        let event = parse_event(&payload).map_err(|e| {
            tracing::warn!("webhook rejected: malformed payload: {e}");
            StatusCode::BAD_REQUEST.into_response()
        })?;

        Ok(Self(event))
    }
}

/// Payment gateway webhook handler.
///
/// Always returns 200 for recognized-but-unprocessable events so the gateway
/// does not retry forever; retries are harmless anyway because the applied
/// transition is idempotent.
#[utoipa::path(
    post,
    path = "/webhooks/payments",
    tag = "webhooks",
    summary = "Receive payment gateway events",
    responses(
        (status = 200, description = "Event accepted"),
        (status = 400, description = "Invalid signature or malformed payload"),
    )
)]
#[tracing::instrument(skip_all, fields(event_type))]
pub async fn payment_webhook(State(state): State<AppState>, GatewayEvent(event): GatewayEvent) -> StatusCode {
    tracing::Span::current().record("event_type", event.event_type.as_str());
    tracing::info!("received gateway webhook event");

    match event.event_type.as_str() {
        "payment.paid" => {
            if let Err(e) = handle_payment_outcome(&state, &event, GatewayOutcome::Succeeded).await {
                tracing::error!("failed to process payment.paid event: {e:#}");
            }
        }
        "payment.failed" => {
            if let Err(e) = handle_payment_outcome(&state, &event, GatewayOutcome::Failed).await {
                tracing::error!("failed to process payment.failed event: {e:#}");
            }
        }
        "checkout_session.completed" => {
            // The customer finished checkout; nothing transitions until the
            // payment event arrives.
            tracing::debug!("checkout session completed");
        }
        other => {
            tracing::debug!("ignoring webhook event type: {other}");
        }
    }

    StatusCode::OK
}

async fn handle_payment_outcome(
    state: &AppState,
    event: &WebhookEvent,
    outcome: GatewayOutcome,
) -> crate::errors::Result<()> {
    let Some(intent_id) = &event.payment_intent_id else {
        tracing::warn!("payment event without payment_intent_id, skipping");
        return Ok(());
    };

    let mut conn = state
        .db
        .acquire()
        .await
        .map_err(|e| crate::errors::Error::Database(e.into()))?;
    let Some(payment) = Payments::new(&mut conn).find_by_intent(intent_id).await? else {
        tracing::warn!(intent_id, "payment event for unknown payment intent, skipping");
        return Ok(());
    };

    // Keep the gateway's resource id as the payment's source reference.
    if let Some(resource_id) = &event.resource_id {
        Payments::new(&mut conn).set_source(payment.id, resource_id).await?;
    }
    drop(conn);

    let report = GatewayReport {
        outcome,
        source_type: event.source_type.clone(),
        allowed_methods: Vec::new(),
    };
    reconcile::apply_report(&state.db, state.gateway.as_ref(), &payment, report).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_payment_paid_event() {
        let payload = r#"{
            "data": {
                "id": "evt_123",
                "attributes": {
                    "type": "payment.paid",
                    "data": {
                        "id": "pay_abc",
                        "attributes": {
                            "payment_intent_id": "pi_123",
                            "source": { "type": "gcash" }
                        }
                    }
                }
            }
        }"#;

        let event = parse_event(payload).expect("should parse");
        assert_eq!(event.event_type, "payment.paid");
        assert_eq!(event.resource_id.as_deref(), Some("pay_abc"));
        assert_eq!(event.payment_intent_id.as_deref(), Some("pi_123"));
        assert_eq!(event.source_type.as_deref(), Some("gcash"));
    }

    #[test]
    fn parses_event_without_resource() {
        let payload = r#"{"data": {"attributes": {"type": "checkout_session.completed"}}}"#;

        let event = parse_event(payload).expect("should parse");
        assert_eq!(event.event_type, "checkout_session.completed");
        assert!(event.payment_intent_id.is_none());
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(parse_event("not json").is_err());
        assert!(parse_event(r#"{"unexpected": true}"#).is_err());
    }

    fn sign(timestamp: &str, payload: &str, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        hex_encode(&mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = r#"{"data":{"attributes":{"type":"payment.paid"}}}"#;
        let secret = "whsk_test_secret";
        let signature = sign("1704067200", payload, secret);

        let header = format!("t=1704067200,te={signature},li=");
        assert!(verify_signature(&header, payload, secret));
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = r#"{"data":{"attributes":{"type":"payment.paid"}}}"#;
        let secret = "whsk_test_secret";
        let signature = sign("1704067200", payload, secret);

        let header = format!("t=1704067200,te={signature}");
        assert!(!verify_signature(&header, r#"{"data":{}}"#, secret));
    }

    #[test]
    fn rejects_wrong_secret_and_missing_parts() {
        let payload = "{}";
        let signature = sign("1", payload, "secret-a");

        assert!(!verify_signature(&format!("t=1,te={signature}"), payload, "secret-b"));
        assert!(!verify_signature("te=abc", payload, "secret-a"));
        assert!(!verify_signature("t=1", payload, "secret-a"));
    }

    mod http {
        use super::*;
        use crate::{
            config::{GatewayConfig, PaymongoConfig},
            test_utils::{create_test_app_with_config, test_config_with_gateway},
        };
        use sqlx::PgPool;

        const SECRET: &str = "whsk_test_secret";

        fn signing_config() -> crate::config::Config {
            test_config_with_gateway(GatewayConfig::Paymongo(PaymongoConfig {
                secret_key: "sk_test_abc".to_string(),
                api_url: "http://gateway.invalid".to_string(),
                webhook_secret: Some(SECRET.to_string()),
            }))
        }

        #[sqlx::test]
        #[test_log::test]
        async fn signed_events_are_accepted(pool: PgPool) {
            let (server, _state) = create_test_app_with_config(pool, signing_config());

            let payload = r#"{"data":{"attributes":{"type":"checkout_session.completed"}}}"#;
            let signature = sign("1704067200", payload, SECRET);

            let response = server
                .post("/webhooks/payments")
                .add_header("paymongo-signature", format!("t=1704067200,te={signature},li="))
                .add_header("content-type", "application/json")
                .text(payload)
                .await;
            response.assert_status(StatusCode::OK);
        }

        #[sqlx::test]
        #[test_log::test]
        async fn tampered_or_unsigned_events_are_rejected(pool: PgPool) {
            let (server, _state) = create_test_app_with_config(pool, signing_config());

            let payload = r#"{"data":{"attributes":{"type":"payment.paid"}}}"#;
            let signature = sign("1704067200", r#"{"something":"else"}"#, SECRET);

            let tampered = server
                .post("/webhooks/payments")
                .add_header("paymongo-signature", format!("t=1704067200,te={signature}"))
                .add_header("content-type", "application/json")
                .text(payload)
                .await;
            tampered.assert_status(StatusCode::BAD_REQUEST);

            let unsigned = server
                .post("/webhooks/payments")
                .add_header("content-type", "application/json")
                .text(payload)
                .await;
            unsigned.assert_status(StatusCode::BAD_REQUEST);
        }
    }
}
