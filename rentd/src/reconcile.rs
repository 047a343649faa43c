//! Payment reconciliation: bringing local payment/booking state in line with
//! the gateway's authoritative status.
//!
//! Two triggers share the transition implemented here: the pull path (a
//! status query for a booking's latest payment) and the push path (webhook
//! delivery, at-least-once and unordered relative to pulls). Both converge
//! because the payment flip is conditional on `status = 'pending'`, the
//! booking write is a pure overwrite of payment metadata, and the
//! confirmation notification is deduplicated by key. The whole write phase
//! runs in one transaction.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::db::handlers::{Bookings, Notifications, Payments};
use crate::db::models::{
    bookings::{BookingPaymentDBUpdate, BookingStatus},
    notifications::NotificationCreateDBRequest,
    payments::{Payment, PaymentStatus},
};
use crate::errors::{Error, Result};
use crate::gateway::{GatewayOutcome, PaymentGateway, PaymentIntent};
use crate::types::BookingId;

/// What a reconciliation trigger learned from the gateway.
#[derive(Debug, Clone)]
pub struct GatewayReport {
    pub outcome: GatewayOutcome,
    /// Instrument type reported with the payment, when available
    pub source_type: Option<String>,
    /// Payment methods that were offered at checkout
    pub allowed_methods: Vec<String>,
}

impl From<PaymentIntent> for GatewayReport {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            outcome: intent.status.outcome(),
            source_type: intent.source_type,
            allowed_methods: intent.allowed_methods,
        }
    }
}

/// Display label for a gateway instrument type.
pub fn method_label(source_type: &str) -> String {
    match source_type {
        "gcash" => "GCash".to_string(),
        "grab_pay" => "GrabPay".to_string(),
        "paymaya" => "PayMaya".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str().replace('_', " ")),
                None => String::new(),
            }
        }
    }
}

/// Label for a method from the allowed-method list. Only the well-known
/// instruments qualify; anything else falls through to the gateway source
/// lookup.
fn label_from_allowed(allowed_methods: &[String]) -> Option<String> {
    allowed_methods.first().and_then(|method| match method.as_str() {
        "gcash" | "grab_pay" | "paymaya" => Some(method_label(method)),
        _ => None,
    })
}

/// Deterministic transaction identifier for a confirmed booking payment:
/// `TXN-<zero-padded booking id>-<YYYYMMDD>`.
pub fn transaction_reference(booking_id: BookingId, date: NaiveDate) -> String {
    format!("TXN-{booking_id:08}-{}", date.format("%Y%m%d"))
}

/// Resolve the payment-method label through the documented fallback chain:
/// the source reported with the payment, then the allowed-method list, then
/// a secondary gateway lookup by source id. A failed lookup degrades to no
/// label rather than failing reconciliation.
async fn resolve_method_label(
    report: &GatewayReport,
    payment: &Payment,
    gateway: &dyn PaymentGateway,
) -> Option<String> {
    if let Some(source_type) = &report.source_type {
        return Some(method_label(source_type));
    }

    if let Some(label) = label_from_allowed(&report.allowed_methods) {
        return Some(label);
    }

    if let Some(source_id) = &payment.source_id {
        match gateway.get_source(source_id).await {
            Ok(source) => return source.source_type.map(|t| method_label(&t)),
            Err(e) => {
                tracing::warn!(payment_id = payment.id, "failed to look up payment source: {e}");
            }
        }
    }

    None
}

/// Apply a gateway report to a local payment, returning the resulting
/// payment status.
///
/// Idempotent and safe to invoke concurrently from the pull and push paths:
/// the loser of the pending-flip race sees no affected row and returns the
/// already-applied state.
#[instrument(skip_all, fields(payment_id = payment.id, booking_id = payment.booking_id), err)]
pub async fn apply_report(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    payment: &Payment,
    report: GatewayReport,
) -> Result<PaymentStatus> {
    match report.outcome {
        GatewayOutcome::Processing => Ok(payment.status),
        GatewayOutcome::Failed => {
            let mut conn = pool.acquire().await.map_err(crate::db::errors::DbError::from)?;
            let flipped = Payments::new(&mut conn).mark_failed(payment.id).await?;
            if flipped {
                tracing::info!(payment_id = payment.id, "payment marked failed from gateway status");
                Ok(PaymentStatus::Failed)
            } else {
                current_status(pool, payment).await
            }
        }
        GatewayOutcome::Succeeded => {
            // The method lookup may hit the gateway again, so it happens
            // before the transaction opens.
            let payment_method = resolve_method_label(&report, payment, gateway).await;
            let today = Utc::now().date_naive();

            let mut tx = pool.begin().await.map_err(crate::db::errors::DbError::from)?;

            let flipped = Payments::new(&mut tx).mark_paid(payment.id).await?;
            if !flipped {
                // Another trigger already applied the transition.
                tx.commit().await.map_err(crate::db::errors::DbError::from)?;
                return current_status(pool, payment).await;
            }

            // A booking already approved, active, or cancelled is not touched.
            let booking = Bookings::new(&mut tx).get_by_id(payment.booking_id).await?;
            if let Some(booking) = booking.filter(|b| b.status == BookingStatus::Pending) {
                let update = BookingPaymentDBUpdate {
                    payment_method,
                    transaction_id: transaction_reference(booking.id, today),
                    reference_number: payment.payment_intent_id.clone().or_else(|| payment.source_id.clone()),
                };
                Bookings::new(&mut tx).record_payment(booking.id, &update).await?;

                let notification =
                    NotificationCreateDBRequest::payment_confirmed(booking.user_id, booking.id, &booking.vehicle_name);
                let created = Notifications::new(&mut tx).create(&notification).await?;
                if created.is_some() {
                    tracing::info!(booking_id = booking.id, "payment confirmed, notification created");
                } else {
                    tracing::info!(booking_id = booking.id, "payment confirmed, notification already exists");
                }
            }

            tx.commit().await.map_err(crate::db::errors::DbError::from)?;
            Ok(PaymentStatus::Paid)
        }
    }
}

async fn current_status(pool: &PgPool, payment: &Payment) -> Result<PaymentStatus> {
    let mut conn = pool.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let current = Payments::new(&mut conn).get_by_id(payment.id).await?;
    Ok(current.map(|p| p.status).ok_or_else(|| Error::NotFound {
        resource: "Payment".to_string(),
        id: payment.id.to_string(),
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_instruments_get_branded_labels() {
        assert_eq!(method_label("gcash"), "GCash");
        assert_eq!(method_label("grab_pay"), "GrabPay");
        assert_eq!(method_label("paymaya"), "PayMaya");
    }

    #[test]
    fn unknown_instruments_are_capitalized_with_spaces() {
        assert_eq!(method_label("bank_transfer"), "Bank transfer");
        assert_eq!(method_label("card"), "Card");
    }

    #[test]
    fn allowed_method_fallback_only_accepts_known_instruments() {
        assert_eq!(label_from_allowed(&["gcash".to_string()]), Some("GCash".to_string()));
        assert_eq!(label_from_allowed(&["wire".to_string()]), None);
        assert_eq!(label_from_allowed(&[]), None);
    }

    #[test]
    fn transaction_reference_is_zero_padded_with_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(transaction_reference(42, date), "TXN-00000042-20250310");
        assert_eq!(transaction_reference(12345678, date), "TXN-12345678-20250310");
    }

    #[test]
    fn transaction_reference_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(transaction_reference(7, date), transaction_reference(7, date));
    }
}
