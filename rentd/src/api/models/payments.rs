//! API request/response models for payments.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::payments::{Payment, PaymentStatus, PaymentWithBooking},
    types::{BookingId, PaymentId},
};

/// Payload for creating a checkout session for a booking's down payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentCreate {
    pub booking_id: BookingId,
    /// Amount to collect, in the gateway's currency
    #[schema(value_type = String)]
    pub amount: Decimal,
}

/// The hosted checkout URL the customer is redirected to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

/// A payment attempt as returned by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub booking_id: BookingId,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub checkout_url: String,
    pub payment_intent_id: Option<String>,
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(db: Payment) -> Self {
        Self {
            id: db.id,
            booking_id: db.booking_id,
            amount: db.amount,
            status: db.status,
            checkout_url: db.checkout_url,
            payment_intent_id: db.payment_intent_id,
            source_id: db.source_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// A payment joined with its booking's display fields, for the per-user list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentWithBookingResponse {
    pub id: PaymentId,
    pub booking_id: BookingId,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub checkout_url: String,
    pub payment_intent_id: Option<String>,
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub vehicle_name: String,
    pub company_name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<PaymentWithBooking> for PaymentWithBookingResponse {
    fn from(db: PaymentWithBooking) -> Self {
        Self {
            id: db.id,
            booking_id: db.booking_id,
            amount: db.amount,
            status: db.status,
            checkout_url: db.checkout_url,
            payment_intent_id: db.payment_intent_id,
            source_id: db.source_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
            vehicle_name: db.vehicle_name,
            company_name: db.company_name,
            start_date: db.start_date,
            end_date: db.end_date,
        }
    }
}
