//! Database models for user notifications.

use crate::types::{BookingId, NotificationId, RequestId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Notification category stored as TEXT in database.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RequestUpdate,
    BookingUpdate,
    General,
}

/// Read state of a notification. The only mutation notifications ever see.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReadStatus {
    Unread,
    Read,
}

/// Database entity model for a notification row.
#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    #[sqlx(rename = "type")]
    pub kind: NotificationKind,
    pub related_request_id: Option<RequestId>,
    pub related_booking_id: Option<BookingId>,
    pub status: ReadStatus,
    pub dedup_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Database request for appending a notification.
#[derive(Debug, Clone)]
pub struct NotificationCreateDBRequest {
    pub user_id: UserId,
    pub message: String,
    pub kind: NotificationKind,
    pub related_request_id: Option<RequestId>,
    pub related_booking_id: Option<BookingId>,
    /// When set, a second insert with the same key is silently skipped.
    pub dedup_key: Option<String>,
}

impl NotificationCreateDBRequest {
    /// The one-time payment-confirmation notification for a booking.
    ///
    /// Deduplicated by `(payment_confirmed, booking_id)` so the pull and push
    /// reconciliation paths together produce exactly one message.
    pub fn payment_confirmed(user_id: UserId, booking_id: BookingId, vehicle_name: &str) -> Self {
        Self {
            user_id,
            message: format!(
                "Your booking for {vehicle_name} (Booking #{booking_id}) has been confirmed and is \
                 waiting for approval. You will be notified once it's approved."
            ),
            kind: NotificationKind::BookingUpdate,
            related_request_id: None,
            related_booking_id: Some(booking_id),
            dedup_key: Some(format!("payment_confirmed:{booking_id}")),
        }
    }
}
