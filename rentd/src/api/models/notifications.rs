//! API response models for notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::notifications::{Notification, NotificationKind, ReadStatus},
    types::{BookingId, NotificationId, RequestId, UserId},
};

/// A notification as shown to its recipient.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub related_request_id: Option<RequestId>,
    pub related_booking_id: Option<BookingId>,
    pub status: ReadStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(db: Notification) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            message: db.message,
            kind: db.kind,
            related_request_id: db.related_request_id,
            related_booking_id: db.related_booking_id,
            status: db.status,
            created_at: db.created_at,
        }
    }
}

/// Unread notification count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}
