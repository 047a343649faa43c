//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all endpoints
//! - **[`models`]**: request/response structures defining the public contract
//!
//! Functional areas:
//!
//! - **Bookings** (`/api/v1/bookings/*`): booking CRUD, synchronized on read
//! - **Requests** (`/api/v1/requests/*`): change request lifecycle and fee preview
//! - **Payments** (`/api/v1/payments/*`): checkout creation and status reconciliation
//! - **Notifications** (`/api/v1/notifications/*`): notification log and read state
//! - **Policies** (`/api/v1/companies/{id}/policy`): company policy preview
//! - **Webhooks** (`/webhooks/payments`): gateway event delivery
//!
//! All endpoints carry OpenAPI annotations (`utoipa`); the rendered
//! documentation is served at `/docs`.

pub mod handlers;
pub mod models;
