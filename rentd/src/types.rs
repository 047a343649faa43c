//! Common type definitions.
//!
//! Entity identifiers are 64-bit integers (BIGSERIAL columns) wrapped in type
//! aliases so signatures document which entity they refer to:
//!
//! - [`UserId`]: booking owner identifier, supplied by the identity verifier
//! - [`CompanyId`]: rental company identifier
//! - [`BookingId`]: booking identifier
//! - [`RequestId`]: change request identifier
//! - [`PaymentId`]: payment attempt identifier
//! - [`NotificationId`]: notification identifier

// Type aliases for IDs
pub type UserId = i64;
pub type CompanyId = i64;
pub type BookingId = i64;
pub type RequestId = i64;
pub type PaymentId = i64;
pub type NotificationId = i64;
