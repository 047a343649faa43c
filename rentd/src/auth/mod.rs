//! Authentication layer.
//!
//! Token *issuance* is out of scope: an external identity provider hands
//! customers a signed bearer token, and this service only verifies it. The
//! [`CurrentUser`] extractor pulls the authenticated user id out of the
//! `Authorization` header for every request/payment operation; handlers
//! trust it without re-validating credentials.

pub mod current_user;
pub mod session;

pub use current_user::CurrentUser;
