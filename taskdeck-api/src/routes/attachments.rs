/// Task attachment endpoints
///
/// # Endpoints
///
/// - `POST /tasks/:id/attachments` - Upload (multipart field `file`, owner only)
/// - `GET /tasks/:id/attachments` - List (owner or shared user)
/// - `GET /tasks/:id/attachments/:filename` - Download (owner or shared user)
/// - `DELETE /tasks/:id/attachments/:filename` - Delete (owner only)
/// - `GET /shared/tasks/:id/attachments[/:filename]` - Shared-user mirrors
///
/// Files always live in the task owner's directory, whoever downloads them.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::notifications::notify,
};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use taskdeck_shared::{
    auth::middleware::AuthContext,
    models::{
        attachment::{Attachment, CreateAttachment},
        notification::{CreateNotification, NotificationKind},
        task::Task,
    },
    storage::{object_key, sanitize_filename, stored_filename},
};
use tracing::{error, info, warn};
use uuid::Uuid;

const FILE_FIELD: &str = "file";
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Loads a task the requester owns or that is shared with them
///
/// 404 when the task does not exist, 403 when the requester cannot see it.
async fn visible_task(state: &AppState, task_id: Uuid, user_id: Uuid) -> ApiResult<Task> {
    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !task.is_visible_to(user_id) {
        warn!(user_id = %user_id, task_id = %task_id, "Attachment access denied");
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    Ok(task)
}

/// Loads a task the requester owns
async fn owned_task(state: &AppState, task_id: Uuid, user_id: Uuid) -> ApiResult<Task> {
    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !task.is_owned_by(user_id) {
        warn!(user_id = %user_id, task_id = %task_id, "Attachment change denied");
        return Err(ApiError::Forbidden(
            "Only the task owner can change attachments".to_string(),
        ));
    }

    Ok(task)
}

/// Loads a task shared with (and not owned by) the requester
async fn shared_task(state: &AppState, task_id: Uuid, user_id: Uuid) -> ApiResult<Task> {
    Task::find_shared_with(&state.db, task_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Shared task not found".to_string()))
}

/// `Content-Disposition` value for a download
fn content_disposition(attachment: &Attachment) -> String {
    let name = sanitize_filename(&attachment.original_filename);
    let name = if name.is_empty() {
        attachment.stored_filename.clone()
    } else {
        name
    };

    format!("attachment; filename=\"{}\"", name)
}

async fn serve_file(state: &AppState, task: &Task, filename: &str) -> ApiResult<Response> {
    let attachment = Attachment::find(&state.db, task.id, filename)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let data = state
        .store
        .get(&object_key(task.user_id, &attachment.stored_filename))
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, attachment.mime_type.clone()),
            (header::CONTENT_DISPOSITION, content_disposition(&attachment)),
        ],
        data,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub attachment: Attachment,
}

/// Uploads a file to one of the requester's tasks
///
/// # Errors
///
/// - `400 Bad Request`: No file, empty filename, disallowed extension, file too large
/// - `403 Forbidden`: The requester does not own the task
/// - `404 Not Found`: The task does not exist
pub async fn upload_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let task = owned_task(&state, task_id, auth.user_id).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        upload = Some((original, mime_type, data));
        break;
    }

    let (original, mime_type, data) =
        upload.ok_or_else(|| ApiError::BadRequest("No file part".to_string()))?;

    let max_bytes = state.config.uploads.max_bytes;
    if data.len() > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File too large. Maximum size is {} MB",
            max_bytes / (1024 * 1024)
        )));
    }

    let stored = stored_filename(&original, Utc::now()).map_err(ApiError::BadRequest)?;
    let key = object_key(task.user_id, &stored);
    let size_bytes = data.len() as i64;

    state.store.put(&key, data).await?;

    let attachment = match Attachment::create(
        &state.db,
        CreateAttachment {
            task_id,
            stored_filename: stored,
            original_filename: original,
            size_bytes,
            mime_type,
        },
    )
    .await
    {
        Ok(attachment) => attachment,
        Err(e) => {
            if let Err(cleanup) = state.store.delete(&key).await {
                error!(error = %cleanup, key = %key, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    info!(
        user_id = %auth.user_id,
        task_id = %task_id,
        stored_filename = %attachment.stored_filename,
        size_bytes,
        "Attachment uploaded"
    );

    for shared_user in &task.shared_with {
        notify(
            &state,
            CreateNotification::new(
                *shared_user,
                format!(
                    "{} added an attachment to '{}': {}",
                    auth.username, task.title, attachment.original_filename
                ),
                NotificationKind::Info,
            )
            .for_task(task_id),
        )
        .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "File uploaded successfully".to_string(),
            attachment,
        }),
    ))
}

/// `GET /tasks/:id/attachments`
pub async fn list_attachments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Attachment>>> {
    let task = visible_task(&state, task_id, auth.user_id).await?;

    Ok(Json(Attachment::list_by_task(&state.db, task.id).await?))
}

/// `GET /tasks/:id/attachments/:filename`
pub async fn download_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((task_id, filename)): Path<(Uuid, String)>,
) -> ApiResult<Response> {
    let task = visible_task(&state, task_id, auth.user_id).await?;

    serve_file(&state, &task, &filename).await
}

#[derive(Debug, Serialize)]
pub struct DeleteAttachmentResponse {
    pub message: String,
}

/// Deletes an attachment's metadata and file
///
/// # Errors
///
/// - `403 Forbidden`: The requester does not own the task
/// - `404 Not Found`: The task or attachment does not exist
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((task_id, filename)): Path<(Uuid, String)>,
) -> ApiResult<Json<DeleteAttachmentResponse>> {
    let task = owned_task(&state, task_id, auth.user_id).await?;

    if !Attachment::delete(&state.db, task_id, &filename).await? {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    let key = object_key(task.user_id, &filename);
    if let Err(e) = state.store.delete(&key).await {
        warn!(error = %e, key = %key, "Failed to remove attachment file");
    }

    info!(
        user_id = %auth.user_id,
        task_id = %task_id,
        stored_filename = %filename,
        "Attachment deleted"
    );

    Ok(Json(DeleteAttachmentResponse {
        message: "File deleted successfully".to_string(),
    }))
}

/// `GET /shared/tasks/:id/attachments`
pub async fn list_shared_attachments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Attachment>>> {
    let task = shared_task(&state, task_id, auth.user_id).await?;

    Ok(Json(Attachment::list_by_task(&state.db, task.id).await?))
}

/// `GET /shared/tasks/:id/attachments/:filename`
pub async fn download_shared_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((task_id, filename)): Path<(Uuid, String)>,
) -> ApiResult<Response> {
    let task = shared_task(&state, task_id, auth.user_id).await?;

    serve_file(&state, &task, &filename).await
}
