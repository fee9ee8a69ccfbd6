/// Notification endpoints and the push helpers used by other handlers
///
/// # Endpoints
///
/// - `GET /notifications` - 20 newest plus unread count
/// - `GET /notifications/all` - 100 newest plus unread count
/// - `GET /notifications/unread_count`
/// - `GET /notifications/stream` - Server-Sent Events for the requester's room
/// - `POST /notifications/:id/read`, `POST /notifications/read_all`
/// - `DELETE /notifications/:id`, `DELETE /notifications/delete_all`
///
/// # SSE Format
///
/// ```text
/// event: notification
/// data: {"id":"...","message":"Task shared with you","type":"info",...}
///
/// event: notifications_updated
/// data: {"unread_count":0}
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::stream::{self, Stream};
use serde::Serialize;
use std::{convert::Infallible, time::Duration};
use taskdeck_shared::{
    auth::middleware::AuthContext,
    models::notification::{CreateNotification, Notification, ALL_LIMIT, RECENT_LIMIT},
    realtime::{PushEvent, UserSubscription},
};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Creates a notification and pushes it to the recipient's room
///
/// Failures are logged and swallowed so the triggering request still succeeds.
pub async fn notify(state: &AppState, data: CreateNotification) {
    let user_id = data.user_id;

    match Notification::create(&state.db, data).await {
        Ok(notification) => {
            let delivered = state
                .hub
                .publish(user_id, PushEvent::Notification(notification));
            debug!(user_id = %user_id, delivered, "Notification created");
        }
        Err(e) => {
            error!(error = %e, user_id = %user_id, "Failed to create notification");
        }
    }
}

/// Pushes the user's current unread count and returns it
async fn push_unread_count(state: &AppState, user_id: Uuid) -> ApiResult<i64> {
    let unread_count = Notification::unread_count(&state.db, user_id).await?;
    state
        .hub
        .publish(user_id, PushEvent::NotificationsUpdated { unread_count });

    Ok(unread_count)
}

/// Notification listing response
#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub success: bool,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub success: bool,
    pub modified_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DeleteAllResponse {
    pub success: bool,
    pub deleted_count: u64,
}

async fn list_with_limit(
    state: &AppState,
    user_id: Uuid,
    limit: i64,
) -> ApiResult<NotificationListResponse> {
    let notifications = Notification::list_recent(&state.db, user_id, limit).await?;
    let unread_count = Notification::unread_count(&state.db, user_id).await?;

    Ok(NotificationListResponse {
        notifications,
        unread_count,
    })
}

/// `GET /notifications`
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<NotificationListResponse>> {
    Ok(Json(list_with_limit(&state, auth.user_id, RECENT_LIMIT).await?))
}

/// `GET /notifications/all`
pub async fn list_all_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<NotificationListResponse>> {
    Ok(Json(list_with_limit(&state, auth.user_id, ALL_LIMIT).await?))
}

/// `GET /notifications/unread_count`
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UnreadCountResponse>> {
    let unread_count = Notification::unread_count(&state.db, auth.user_id).await?;

    Ok(Json(UnreadCountResponse { unread_count }))
}

/// Marks one of the requester's notifications read
///
/// # Errors
///
/// - `404 Not Found`: The notification does not exist or belongs to someone else
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MarkReadResponse>> {
    if !Notification::mark_read(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }

    let unread_count = push_unread_count(&state, auth.user_id).await?;

    Ok(Json(MarkReadResponse {
        success: true,
        unread_count,
    }))
}

/// Marks all of the requester's notifications read
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let modified_count = Notification::mark_all_read(&state.db, auth.user_id).await?;
    push_unread_count(&state, auth.user_id).await?;

    info!(user_id = %auth.user_id, modified_count, "Marked all notifications read");

    Ok(Json(MarkAllReadResponse {
        success: true,
        modified_count,
    }))
}

/// `DELETE /notifications/:id`
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MarkReadResponse>> {
    if !Notification::delete(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }

    let unread_count = push_unread_count(&state, auth.user_id).await?;

    Ok(Json(MarkReadResponse {
        success: true,
        unread_count,
    }))
}

/// `DELETE /notifications/delete_all`
pub async fn delete_all_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DeleteAllResponse>> {
    let deleted_count = Notification::delete_all(&state.db, auth.user_id).await?;
    push_unread_count(&state, auth.user_id).await?;

    info!(user_id = %auth.user_id, deleted_count, "Deleted all notifications");

    Ok(Json(DeleteAllResponse {
        success: true,
        deleted_count,
    }))
}

/// Streams the requester's room as Server-Sent Events
///
/// Only events published while the stream is open are delivered.
pub async fn notification_stream(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(user_id = %auth.user_id, "Opening notification stream");

    let subscription = state.hub.subscribe(auth.user_id);

    Sse::new(event_stream(subscription))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(25)))
}

fn event_stream(subscription: UserSubscription) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(subscription, |mut subscription| async move {
        loop {
            let event = subscription.recv().await?;

            match to_sse_event(&event) {
                Some(sse) => return Some((Ok(sse), subscription)),
                None => continue,
            }
        }
    })
}

fn to_sse_event(event: &PushEvent) -> Option<Event> {
    match event.to_json() {
        Ok(data) => Some(Event::default().event(event.name()).data(data)),
        Err(e) => {
            error!(error = %e, event = event.name(), "Failed to serialize push event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use taskdeck_shared::realtime::NotificationHub;

    #[tokio::test]
    async fn test_event_stream_yields_own_events_only() {
        let hub = NotificationHub::new(16);
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        let stream = event_stream(hub.subscribe(me));
        futures::pin_mut!(stream);

        hub.publish(other, PushEvent::NotificationsUpdated { unread_count: 9 });
        hub.publish(me, PushEvent::NotificationsUpdated { unread_count: 2 });

        let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap();
        assert!(matches!(next, Some(Ok(_))));
    }

    #[tokio::test]
    async fn test_event_stream_ends_when_hub_dropped() {
        let hub = NotificationHub::new(16);
        let stream = event_stream(hub.subscribe(Uuid::new_v4()));
        drop(hub);

        futures::pin_mut!(stream);
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_to_sse_event() {
        let event = PushEvent::NotificationsUpdated { unread_count: 0 };
        assert!(to_sse_event(&event).is_some());
    }
}
