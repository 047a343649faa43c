//! Database model for per-company reschedule/cancellation policies.

use crate::types::CompanyId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Default free-reschedule window in days, applied when a company has no
/// policy row.
pub const DEFAULT_RESCHEDULE_FREE_DAYS: i32 = 3;

/// Default reschedule fee percentage.
pub fn default_reschedule_fee_percentage() -> Decimal {
    Decimal::new(10, 0)
}

/// Default cancellation fee percentage.
pub fn default_cancellation_fee_percentage() -> Decimal {
    Decimal::new(20, 0)
}

/// A fully-populated company policy.
///
/// Read-only from this subsystem's perspective. Companies without a stored
/// row get [`Policy::default_for_company`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Policy {
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

impl Policy {
    /// The documented default policy for a company with no stored row.
    pub fn default_for_company(company_id: CompanyId) -> Self {
        Self {
            company_id,
            reschedule_terms: "Rescheduling is free if requested at least 3 days before the booking \
                               start date. A fee of 10% applies for reschedule requests made within \
                               3 days of the booking."
                .to_string(),
            cancellation_terms: "Cancellation is allowed up to 24 hours before booking. A cancellation \
                                 fee of 20% applies. Cancellations within 24 hours are non-refundable."
                .to_string(),
            refund_terms: "Deposits and reservation fees are non-refundable. Full refunds are only \
                           available for cancellations made more than 7 days in advance."
                .to_string(),
            allow_reschedule: true,
            allow_cancellation: true,
            allow_refund: false,
            reschedule_free_days: DEFAULT_RESCHEDULE_FREE_DAYS,
            reschedule_fee_percentage: default_reschedule_fee_percentage(),
            cancellation_fee_percentage: default_cancellation_fee_percentage(),
            deposit_refundable: false,
            last_updated: Utc::now(),
        }
    }
}
