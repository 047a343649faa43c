//! API response model for company policies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{db::models::policies::Policy, types::CompanyId};

/// A company's reschedule/cancellation policy, with defaults filled in for
/// companies that have not stored one.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PolicyResponse {
    pub company_id: CompanyId,
    pub reschedule_terms: String,
    pub cancellation_terms: String,
    pub refund_terms: String,
    pub allow_reschedule: bool,
    pub allow_cancellation: bool,
    pub allow_refund: bool,
    pub reschedule_free_days: i32,
    #[schema(value_type = String)]
    pub reschedule_fee_percentage: Decimal,
    #[schema(value_type = String)]
    pub cancellation_fee_percentage: Decimal,
    pub deposit_refundable: bool,
    pub last_updated: DateTime<Utc>,
}

impl From<Policy> for PolicyResponse {
    fn from(db: Policy) -> Self {
        Self {
            company_id: db.company_id,
            reschedule_terms: db.reschedule_terms,
            cancellation_terms: db.cancellation_terms,
            refund_terms: db.refund_terms,
            allow_reschedule: db.allow_reschedule,
            allow_cancellation: db.allow_cancellation,
            allow_refund: db.allow_refund,
            reschedule_free_days: db.reschedule_free_days,
            reschedule_fee_percentage: db.reschedule_fee_percentage,
            cancellation_fee_percentage: db.cancellation_fee_percentage,
            deposit_refundable: db.deposit_refundable,
            last_updated: db.last_updated,
        }
    }
}
