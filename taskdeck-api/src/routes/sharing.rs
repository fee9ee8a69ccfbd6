/// Task sharing endpoints
///
/// # Endpoints
///
/// - `POST /tasks/:id/share` - Grant another user read access (owner only)
/// - `GET /tasks/shared` - Tasks other users have shared with the requester
/// - `DELETE /tasks/shared/:id/remove` - Drop a task someone shared with the requester

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::notifications::notify,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    auth::middleware::AuthContext,
    models::{
        notification::{CreateNotification, NotificationKind},
        task::{SharedTask, Task},
        user::User,
    },
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Share request
#[derive(Debug, Deserialize, Validate)]
pub struct ShareTaskRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
}

/// Share response
#[derive(Debug, Serialize)]
pub struct ShareTaskResponse {
    pub message: String,

    /// True when the task was already shared with the user (nothing changed)
    pub already_shared: bool,
}

/// Shares one of the requester's tasks with another user
///
/// Sharing is idempotent. Both parties are notified only when the user is
/// actually added.
///
/// # Errors
///
/// - `400 Bad Request`: Missing username, or sharing with oneself
/// - `403 Forbidden`: The requester does not own the task
/// - `404 Not Found`: The task or the target user does not exist
pub async fn share_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<ShareTaskRequest>,
) -> ApiResult<Json<ShareTaskResponse>> {
    req.validate()?;

    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !task.is_owned_by(auth.user_id) {
        warn!(user_id = %auth.user_id, task_id = %task_id, "Share denied");
        return Err(ApiError::Forbidden(
            "You can only share your own tasks".to_string(),
        ));
    }

    let target = User::find_by_username(&state.db, req.username.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if target.id == auth.user_id {
        return Err(ApiError::BadRequest(
            "You cannot share a task with yourself".to_string(),
        ));
    }

    let added = Task::share(&state.db, task_id, auth.user_id, target.id).await?;

    if !added {
        return Ok(Json(ShareTaskResponse {
            message: format!("Task is already shared with {}", target.username),
            already_shared: true,
        }));
    }

    info!(
        user_id = %auth.user_id,
        task_id = %task_id,
        shared_with = %target.id,
        "Task shared"
    );

    notify(
        &state,
        CreateNotification::new(
            target.id,
            format!("{} shared a task with you: {}", auth.username, task.title),
            NotificationKind::Info,
        )
        .for_task(task_id),
    )
    .await;

    notify(
        &state,
        CreateNotification::new(
            auth.user_id,
            format!("Task '{}' shared with {}", task.title, target.username),
            NotificationKind::Success,
        )
        .for_task(task_id),
    )
    .await;

    Ok(Json(ShareTaskResponse {
        message: format!("Task shared with {}", target.username),
        already_shared: false,
    }))
}

/// `GET /tasks/shared`
pub async fn shared_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<SharedTask>>> {
    let tasks = Task::list_shared_with(&state.db, auth.user_id).await?;

    Ok(Json(tasks))
}

#[derive(Debug, Serialize)]
pub struct RemoveSharedResponse {
    pub message: String,
}

/// Removes the requester from a task's shared-with list and tells the owner
///
/// # Errors
///
/// - `404 Not Found`: The task is not shared with the requester
pub async fn remove_shared_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<RemoveSharedResponse>> {
    let task = Task::find_shared_with(&state.db, task_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Shared task not found".to_string()))?;

    if !Task::unshare(&state.db, task_id, auth.user_id).await? {
        return Err(ApiError::NotFound("Shared task not found".to_string()));
    }

    info!(user_id = %auth.user_id, task_id = %task_id, "Removed shared task");

    notify(
        &state,
        CreateNotification::new(
            task.user_id,
            format!("{} removed your shared task: {}", auth.username, task.title),
            NotificationKind::Info,
        )
        .for_task(task_id),
    )
    .await;

    Ok(Json(RemoveSharedResponse {
        message: "Shared task removed".to_string(),
    }))
}
