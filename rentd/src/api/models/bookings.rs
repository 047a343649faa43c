//! API request/response models for bookings.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::bookings::{Booking, BookingPaymentStatus, BookingStatus},
    types::{BookingId, CompanyId, UserId},
};

/// Payload for creating a booking.
///
/// ID document uploads are handled by a separate service; this payload only
/// carries the resulting object-store URLs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingCreate {
    pub full_name: String,
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
    #[schema(value_type = Option<String>)]
    pub total_cost: Option<Decimal>,
}

/// Payload for deleting several cancelled bookings at once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingDeleteMany {
    pub booking_ids: Vec<BookingId>,
}

/// A booking as returned to its owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingResponse {
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
    pub status: BookingStatus,
    pub payment_status: BookingPaymentStatus,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub transaction_date: Option<DateTime<Utc>>,
    pub reference_number: Option<String>,
    #[schema(value_type = Option<String>)]
    pub total_cost: Option<Decimal>,
    pub booking_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(db: Booking) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            user_name: db.user_name,
            mobile_number: db.mobile_number,
            vehicle_id: db.vehicle_id,
            vehicle_name: db.vehicle_name,
            company_id: db.company_id,
            company_name: db.company_name,
            service_type: db.service_type,
            start_date: db.start_date,
            end_date: db.end_date,
            rent_time: db.rent_time,
            destination: db.destination,
            occasion: db.occasion,
            message: db.message,
            status: db.status,
            payment_status: db.payment_status,
            payment_method: db.payment_method,
            transaction_id: db.transaction_id,
            transaction_date: db.transaction_date,
            reference_number: db.reference_number,
            total_cost: db.total_cost,
            booking_date: db.booking_date,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
