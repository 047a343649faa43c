//! OpenAPI document assembly.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "rentd",
        description = "Booking lifecycle and payment reconciliation backend for a vehicle rental marketplace"
    ),
    paths(
        api::handlers::bookings::create_booking,
        api::handlers::bookings::list_bookings,
        api::handlers::bookings::get_booking,
        api::handlers::bookings::delete_booking,
        api::handlers::bookings::delete_bookings,
        api::handlers::requests::create_request,
        api::handlers::requests::compute_fee,
        api::handlers::requests::list_requests,
        api::handlers::requests::get_request,
        api::handlers::requests::decide_request,
        api::handlers::requests::delete_request,
        api::handlers::requests::delete_requests,
        api::handlers::payments::create_payment,
        api::handlers::payments::payment_status,
        api::handlers::payments::list_payments,
        api::handlers::notifications::list_notifications,
        api::handlers::notifications::unread_count,
        api::handlers::notifications::mark_read,
        api::handlers::notifications::mark_all_read,
        api::handlers::policies::get_policy,
        api::handlers::webhooks::payment_webhook,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "bookings", description = "Booking management"),
        (name = "requests", description = "Reschedule and cancellation requests"),
        (name = "payments", description = "Down payment checkout and reconciliation"),
        (name = "notifications", description = "User notification log"),
        (name = "policies", description = "Company policy preview"),
        (name = "webhooks", description = "Payment gateway event delivery"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "BearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
