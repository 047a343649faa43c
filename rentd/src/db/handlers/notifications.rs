//! Database repository for the append-only notification log.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::models::notifications::{Notification, NotificationCreateDBRequest};
use crate::types::{NotificationId, UserId};

pub struct Notifications<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Notifications<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Append a notification.
    ///
    /// When the request carries a dedup key that already exists the insert is
    /// skipped and `None` is returned, making one-shot notifications safe to
    /// emit from racing reconciliation paths.
    #[instrument(skip(self, request), fields(user_id = request.user_id), err)]
    pub async fn create(&mut self, request: &NotificationCreateDBRequest) -> Result<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, message, type, related_request_id, related_booking_id, dedup_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (dedup_key) WHERE dedup_key IS NOT NULL DO NOTHING
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(&request.message)
        .bind(request.kind)
        .bind(request.related_request_id)
        .bind(request.related_booking_id)
        .bind(&request.dedup_key)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(notification)
    }

    /// Most recent notifications for a user.
    #[instrument(skip(self), err)]
    pub async fn list_for_user(&mut self, user_id: UserId, limit: i64) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(notifications)
    }

    /// Number of unread notifications for a user.
    #[instrument(skip(self), err)]
    pub async fn unread_count(&mut self, user_id: UserId) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND status = 'unread'")
                .bind(user_id)
                .fetch_one(&mut *self.db)
                .await?;

        Ok(count)
    }

    /// Mark one notification as read, scoped to its owner.
    #[instrument(skip(self), err)]
    pub async fn mark_read(&mut self, id: NotificationId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET status = 'read' WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark all of a user's unread notifications as read.
    #[instrument(skip(self), err)]
    pub async fn mark_all_read(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET status = 'read' WHERE user_id = $1 AND status = 'unread'")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
