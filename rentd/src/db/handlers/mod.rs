//! Repository implementations for database access.
//!
//! Each major entity has a repository struct that wraps a SQLx connection,
//! runs parameterized queries, and returns domain models from
//! [`crate::db::models`]. Repositories created from the same transaction
//! share its atomicity.
//!
//! - [`Bookings`]: booking rows and the payment fields written on confirmation
//! - [`Requests`]: change request lifecycle and enriched reads
//! - [`Policies`]: per-company policy resolution with documented defaults
//! - [`Payments`]: payment attempts and conditional status transitions
//! - [`Notifications`]: append-only notification log with idempotent inserts

pub mod bookings;
pub mod notifications;
pub mod payments;
pub mod policies;
pub mod requests;

pub use bookings::Bookings;
pub use notifications::Notifications;
pub use payments::Payments;
pub use policies::Policies;
pub use requests::Requests;
