//! Fee computation for reschedule and cancellation requests.
//!
//! A single pure function backs both the preview endpoint and the fee stored
//! at request creation, so the two agree for the same booking, policy, and
//! day. The returned value is a policy *percentage figure*, not a currency
//! amount multiplied against the booking cost.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::{policies::Policy, requests::RequestType};

/// The outcome of a fee computation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeeQuote {
    /// Fee charged for the request, as a percentage figure.
    #[schema(value_type = String)]
    pub fee: Decimal,
    /// The policy percentage that was applied (zero inside the free window).
    #[schema(value_type = String)]
    pub percentage: Decimal,
    /// Human-readable explanation of how the fee was determined.
    pub explanation: String,
}

/// Whole calendar days from `today` until the booking starts. Negative when
/// the booking has already started.
pub fn days_until(booking_start: NaiveDate, today: NaiveDate) -> i64 {
    (booking_start - today).num_days()
}

/// Compute the fee for a proposed request under the given policy.
///
/// Reschedules are free when requested at least `reschedule_free_days` before
/// the booking start; otherwise the policy's reschedule percentage applies.
/// Cancellations always carry the cancellation percentage, with no free
/// window.
pub fn quote(request_type: RequestType, policy: &Policy, booking_start: NaiveDate, today: NaiveDate) -> FeeQuote {
    match request_type {
        RequestType::Reschedule => {
            let days = days_until(booking_start, today);
            if days >= i64::from(policy.reschedule_free_days) {
                FeeQuote {
                    fee: Decimal::ZERO,
                    percentage: Decimal::ZERO,
                    explanation: format!(
                        "Reschedule is free if requested at least {} days before booking",
                        policy.reschedule_free_days
                    ),
                }
            } else {
                let percentage = policy.reschedule_fee_percentage;
                FeeQuote {
                    fee: percentage,
                    percentage,
                    explanation: format!(
                        "Reschedule fee of {}% applies when requested within {} days of booking",
                        percentage, policy.reschedule_free_days
                    ),
                }
            }
        }
        RequestType::Cancellation => {
            let percentage = policy.cancellation_fee_percentage;
            FeeQuote {
                fee: percentage,
                percentage,
                explanation: format!("Cancellation fee of {percentage}% applies"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn policy() -> Policy {
        Policy::default_for_company(1)
    }

    #[test]
    fn reschedule_outside_free_window_is_free() {
        let today = date(2025, 3, 5);
        let quote = quote(RequestType::Reschedule, &policy(), date(2025, 3, 10), today);
        assert_eq!(quote.fee, Decimal::ZERO);
        assert_eq!(quote.percentage, Decimal::ZERO);
        assert!(quote.explanation.contains("at least 3 days"));
    }

    #[test]
    fn reschedule_inside_free_window_charges_policy_percentage() {
        let today = date(2025, 3, 5);
        let quote = quote(RequestType::Reschedule, &policy(), date(2025, 3, 6), today);
        assert_eq!(quote.fee, Decimal::new(10, 0));
        assert_eq!(quote.percentage, Decimal::new(10, 0));
    }

    #[test]
    fn reschedule_exactly_at_free_days_boundary_is_free() {
        let today = date(2025, 3, 5);
        // Exactly 3 days out with free_days = 3: still free.
        let quote = quote(RequestType::Reschedule, &policy(), date(2025, 3, 8), today);
        assert_eq!(quote.fee, Decimal::ZERO);
    }

    #[test]
    fn cancellation_always_charges_policy_percentage() {
        let today = date(2025, 3, 5);
        // Far in the future, still charged: cancellations have no free window.
        let quote = quote(RequestType::Cancellation, &policy(), date(2025, 6, 1), today);
        assert_eq!(quote.fee, Decimal::new(20, 0));
        assert_eq!(quote.percentage, Decimal::new(20, 0));
    }

    #[test]
    fn default_policy_cancellation_fee_is_twenty_percent() {
        // No stored policy row resolves to the documented defaults.
        let quote = quote(
            RequestType::Cancellation,
            &Policy::default_for_company(42),
            date(2025, 3, 10),
            date(2025, 3, 5),
        );
        assert_eq!(quote.fee, Decimal::new(20, 0));
    }

    #[test]
    fn quote_is_deterministic_for_fixed_day() {
        let today = date(2025, 3, 5);
        let p = policy();
        let first = quote(RequestType::Reschedule, &p, date(2025, 3, 6), today);
        let second = quote(RequestType::Reschedule, &p, date(2025, 3, 6), today);
        assert_eq!(first.fee, second.fee);
        assert_eq!(first.percentage, second.percentage);
        assert_eq!(first.explanation, second.explanation);
    }

    #[test]
    fn past_booking_start_counts_as_inside_window() {
        let today = date(2025, 3, 5);
        let quote = quote(RequestType::Reschedule, &policy(), date(2025, 3, 1), today);
        assert_eq!(quote.fee, Decimal::new(10, 0));
    }
}
