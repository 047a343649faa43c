//! Database models for change requests (reschedule / cancellation).

use crate::types::{BookingId, CompanyId, RequestId, UserId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// The two kinds of change a customer can propose against a booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Reschedule,
    Cancellation,
}

/// Request lifecycle status. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Database entity model for a request row.
#[derive(Debug, Clone, FromRow)]
pub struct Request {
    pub id: RequestId,
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub booking_id: BookingId,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub reason: String,
    pub company_remark: Option<String>,
    pub new_start_date: Option<NaiveDate>,
    pub new_end_date: Option<NaiveDate>,
    pub new_rent_time: Option<NaiveTime>,
    pub computed_fee: Decimal,
    pub company_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A request joined with display fields from its booking and company,
/// as returned by the read operations.
#[derive(Debug, Clone, FromRow)]
pub struct EnrichedRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub booking_id: BookingId,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub reason: String,
    pub company_remark: Option<String>,
    pub new_start_date: Option<NaiveDate>,
    pub new_end_date: Option<NaiveDate>,
    pub new_rent_time: Option<NaiveTime>,
    pub computed_fee: Decimal,
    pub company_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub vehicle_name: String,
    pub original_start_date: NaiveDate,
    pub original_end_date: NaiveDate,
    pub original_rent_time: Option<NaiveTime>,
    pub company_name: Option<String>,
}

/// Database request for creating a new change request
#[derive(Debug, Clone)]
pub struct RequestCreateDBRequest {
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub booking_id: BookingId,
    pub request_type: RequestType,
    pub reason: String,
    pub new_start_date: Option<NaiveDate>,
    pub new_end_date: Option<NaiveDate>,
    pub new_rent_time: Option<NaiveTime>,
    pub computed_fee: Decimal,
}

/// Company decision on a pending request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for RequestStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => RequestStatus::Approved,
            Decision::Rejected => RequestStatus::Rejected,
        }
    }
}
