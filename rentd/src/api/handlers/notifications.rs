//! HTTP handlers for the notification log.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    api::models::notifications::{NotificationResponse, UnreadCountResponse},
    auth::CurrentUser,
    db::handlers::Notifications,
    errors::{Error, Result},
    types::NotificationId,
};

/// How many notifications a single listing returns.
const NOTIFICATION_PAGE_SIZE: i64 = 50;

/// List the caller's notifications
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    summary = "List my notifications",
    responses(
        (status = 200, description = "Most recent notifications", body = Vec<NotificationResponse>),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<NotificationResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let notifications = Notifications::new(&mut conn)
        .list_for_user(user.id, NOTIFICATION_PAGE_SIZE)
        .await?;

    Ok(Json(notifications.into_iter().map(NotificationResponse::from).collect()))
}

/// Count the caller's unread notifications
#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    tag = "notifications",
    summary = "Count unread notifications",
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn unread_count(State(state): State<AppState>, user: CurrentUser) -> Result<Json<UnreadCountResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let count = Notifications::new(&mut conn).unread_count(user.id).await?;

    Ok(Json(UnreadCountResponse { count }))
}

/// Mark a notification as read
#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "notifications",
    summary = "Mark a notification as read",
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked as read"),
        (status = 404, description = "Notification not found or not owned by the caller"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let updated = Notifications::new(&mut conn).mark_read(id, user.id).await?;
    if !updated {
        return Err(Error::NotFound {
            resource: "Notification".to_string(),
            id: id.to_string(),
        });
    }

    Ok(Json(serde_json::json!({ "message": "Notification marked as read" })))
}

/// Mark all of the caller's notifications as read
#[utoipa::path(
    put,
    path = "/notifications/read-all",
    tag = "notifications",
    summary = "Mark all notifications as read",
    responses(
        (status = 200, description = "All notifications marked as read"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn mark_all_read(State(state): State<AppState>, user: CurrentUser) -> Result<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    Notifications::new(&mut conn).mark_all_read(user.id).await?;

    Ok(Json(serde_json::json!({ "message": "All notifications marked as read" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::models::notifications::{NotificationCreateDBRequest, NotificationKind, ReadStatus},
        test_utils::*,
    };
    use axum::http::StatusCode;
    use sqlx::PgPool;

    const USER: i64 = 1;

    async fn seed_notification(pool: &PgPool, user_id: i64, message: &str) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        Notifications::new(&mut conn)
            .create(&NotificationCreateDBRequest {
                user_id,
                message: message.to_string(),
                kind: NotificationKind::General,
                related_request_id: None,
                related_booking_id: None,
                dedup_key: None,
            })
            .await
            .unwrap()
            .expect("notification without dedup key is always inserted")
            .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn read_state_is_scoped_to_the_owner(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone());
        let id = seed_notification(&pool, USER, "hello").await;

        let foreign = server
            .put(&format!("/api/v1/notifications/{id}/read"))
            .add_header("authorization", bearer(USER + 1))
            .await;
        foreign.assert_status(StatusCode::NOT_FOUND);

        server
            .put(&format!("/api/v1/notifications/{id}/read"))
            .add_header("authorization", bearer(USER))
            .await
            .assert_status_ok();

        let listed = server
            .get("/api/v1/notifications")
            .add_header("authorization", bearer(USER))
            .await;
        let listed: Vec<NotificationResponse> = listed.json();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, ReadStatus::Read);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn unread_count_tracks_mark_all_read(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone());
        seed_notification(&pool, USER, "one").await;
        seed_notification(&pool, USER, "two").await;
        seed_notification(&pool, USER + 1, "someone else's").await;

        let count = server
            .get("/api/v1/notifications/unread-count")
            .add_header("authorization", bearer(USER))
            .await;
        assert_eq!(count.json::<UnreadCountResponse>().count, 2);

        server
            .put("/api/v1/notifications/read-all")
            .add_header("authorization", bearer(USER))
            .await
            .assert_status_ok();

        let count = server
            .get("/api/v1/notifications/unread-count")
            .add_header("authorization", bearer(USER))
            .await;
        assert_eq!(count.json::<UnreadCountResponse>().count, 0);
    }
}
