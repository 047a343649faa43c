//! Database models for payment attempts.

use crate::types::{BookingId, PaymentId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Payment attempt status stored as TEXT in database.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// Database entity model for a payment row.
///
/// A booking may accumulate several payment rows across retries; the most
/// recent by creation time is authoritative.
#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub checkout_url: String,
    pub payment_intent_id: Option<String>,
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A payment joined with display fields from its booking, as returned by the
/// per-user listing.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentWithBooking {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub checkout_url: String,
    pub payment_intent_id: Option<String>,
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub vehicle_name: String,
    pub company_name: Option<String>,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

/// Database request for creating a new payment row.
///
/// Only constructed after the gateway checkout call has succeeded, so a
/// failed checkout never leaves a dangling payment row.
#[derive(Debug, Clone)]
pub struct PaymentCreateDBRequest {
    pub booking_id: BookingId,
    pub amount: Decimal,
    pub checkout_url: String,
    pub payment_intent_id: Option<String>,
    pub source_id: Option<String>,
}
