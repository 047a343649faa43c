//! API request and response data models.
//!
//! These structures define the public API contract and are distinct from the
//! database models, so the two can evolve independently. All models carry
//! `utoipa` annotations for the generated API documentation.

pub mod bookings;
pub mod notifications;
pub mod payments;
pub mod policies;
pub mod requests;
