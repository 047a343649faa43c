//! API request/response models for change requests.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::requests::{EnrichedRequest, RequestStatus, RequestType},
    fees::FeeQuote,
    types::{BookingId, CompanyId, RequestId, UserId},
};

/// Payload for creating a reschedule or cancellation request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestCreate {
    /// Booking the request is made against
    pub booking_id: BookingId,
    /// "reschedule" or "cancellation"
    pub request_type: String,
    /// Customer's reason for the request
    pub reason: String,
    /// Proposed new start date (reschedule only)
    pub new_start_date: Option<NaiveDate>,
    /// Proposed new end date (reschedule only)
    pub new_end_date: Option<NaiveDate>,
    /// Proposed new rent time (reschedule only)
    pub new_rent_time: Option<NaiveTime>,
}

/// Payload for previewing the fee of a request before submitting it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComputeFeeRequest {
    pub booking_id: BookingId,
    /// "reschedule" or "cancellation"
    pub request_type: String,
}

/// Fee preview. The same computation runs again at creation time and yields
/// the same result for the same day.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComputeFeeResponse {
    /// The fee that would be stored on the request (a percentage figure)
    #[schema(value_type = String)]
    pub computed_fee: Decimal,
    pub fee_details: FeeQuote,
    /// Whether a stored policy row applied, as opposed to the defaults
    pub policy_applied: bool,
}

/// Company decision payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecisionRequest {
    /// "approved" or "rejected"
    pub status: String,
    /// Free-text response shown to the customer
    pub company_response: Option<String>,
    /// Administrative remark kept alongside the customer's reason
    pub company_remark: Option<String>,
}

/// Payload for deleting several resolved requests at once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestDeleteMany {
    pub request_ids: Vec<RequestId>,
}

/// Result of a bulk delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteManyResponse {
    pub message: String,
    pub deleted_count: u64,
}

/// A change request enriched with booking and company display fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestResponse {
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
    /// Fee computed at creation time (a percentage figure)
    #[schema(value_type = String)]
    pub computed_fee: Decimal,
    pub company_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Vehicle of the underlying booking
    pub vehicle_name: String,
    /// Booking schedule at read time (pre-reschedule values while pending)
    pub original_start_date: NaiveDate,
    pub original_end_date: NaiveDate,
    pub original_rent_time: Option<NaiveTime>,
    pub company_name: Option<String>,
}

impl From<EnrichedRequest> for RequestResponse {
    fn from(db: EnrichedRequest) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            company_id: db.company_id,
            booking_id: db.booking_id,
            request_type: db.request_type,
            status: db.status,
            reason: db.reason,
            company_remark: db.company_remark,
            new_start_date: db.new_start_date,
            new_end_date: db.new_end_date,
            new_rent_time: db.new_rent_time,
            computed_fee: db.computed_fee,
            company_response: db.company_response,
            created_at: db.created_at,
            updated_at: db.updated_at,
            vehicle_name: db.vehicle_name,
            original_start_date: db.original_start_date,
            original_end_date: db.original_end_date,
            original_rent_time: db.original_rent_time,
            company_name: db.company_name,
        }
    }
}
