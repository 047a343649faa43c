//! Database models for bookings.

use crate::types::{BookingId, CompanyId, UserId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Booking lifecycle status stored as TEXT in database.
///
/// `Pending` bookings are awaiting company approval; only `Cancelled`
/// bookings may be deleted by their owner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text")]
pub enum BookingStatus {
    Pending,
    Active,
    Cancelled,
    Completed,
}

/// Payment state of a booking, independent of its lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingPaymentStatus {
    Unpaid,
    Paid,
    Failed,
}

/// Database entity model for a booking row.
#[derive(Debug, Clone, FromRow)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub user_name: String,
    pub mobile_number: String,
    pub vehicle_id: Option<i64>,
    pub vehicle_name: String,
    pub company_id: CompanyId,
    pub company_name: Option<String>,
    pub service_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent_time: Option<NaiveTime>,
    pub destination: String,
    pub occasion: Option<String>,
    pub message: Option<String>,
    pub valid_id_url: Option<String>,
    pub additional_id_url: Option<String>,
    pub total_cost: Option<Decimal>,
    pub status: BookingStatus,
    pub payment_status: BookingPaymentStatus,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub transaction_date: Option<DateTime<Utc>>,
    pub reference_number: Option<String>,
    pub booking_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database request for creating a new booking
#[derive(Debug, Clone)]
pub struct BookingCreateDBRequest {
    pub user_id: UserId,
    pub user_name: String,
    pub mobile_number: String,
    pub vehicle_id: Option<i64>,
    pub vehicle_name: String,
    pub company_id: CompanyId,
    pub company_name: Option<String>,
    pub service_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent_time: Option<NaiveTime>,
    pub destination: String,
    pub occasion: Option<String>,
    pub message: Option<String>,
    pub valid_id_url: Option<String>,
    pub additional_id_url: Option<String>,
    pub total_cost: Option<Decimal>,
}

/// Payment fields written onto a booking when the gateway reports success.
///
/// The booking's lifecycle `status` is intentionally not part of this struct:
/// payment confirmation never approves a booking.
#[derive(Debug, Clone)]
pub struct BookingPaymentDBUpdate {
    pub payment_method: Option<String>,
    pub transaction_id: String,
    pub reference_number: Option<String>,
}
