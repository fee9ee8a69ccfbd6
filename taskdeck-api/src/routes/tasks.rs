/// Task endpoints
///
/// # Endpoints
///
/// - `GET /` - Dashboard: counts, completion percentage, optional filtered list
/// - `GET /api/tasks` - JSON list of the requester's tasks
/// - `GET /filter_tasks` - Task list plus the active filter
/// - `POST /add_task` - Create a task
/// - `POST /update` - Replace a task's fields (owner only)
/// - `POST /delete_task/:id` - Delete a task (owner only)
///
/// Every operation is scoped to the authenticated requester. Owners are
/// notified of their own creations; users a task is shared with are
/// notified of updates and deletion.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::notifications::notify,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    auth::middleware::AuthContext,
    models::{
        attachment::Attachment,
        notification::{CreateNotification, NotificationKind},
        task::{
            parse_deadline, CreateTask, Task, TaskCounts, TaskFilter, TaskStatus, UpdateTask,
        },
    },
    storage::object_key,
};
use tracing::{info, warn};
use uuid::Uuid;

const NOT_OWNED: &str = "Unauthorized or task not found";

/// Parses a `status` query value; `all` and empty mean "no filter"
fn parse_status_filter(raw: Option<&str>) -> ApiResult<Option<TaskStatus>> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => value
            .parse::<TaskStatus>()
            .map(Some)
            .map_err(|msg| ApiError::validation("status", msg)),
    }
}

fn required(field: &str, value: &str, message: &str, errors: &mut Vec<ValidationErrorDetail>) {
    if value.trim().is_empty() {
        errors.push(ValidationErrorDetail {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

/// Query for the dashboard
#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub status: Option<String>,
    pub search: Option<String>,

    /// `deadline` sorts by deadline ascending
    pub sort: Option<String>,
}

/// Dashboard response
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub username: String,

    #[serde(flatten)]
    pub counts: TaskCounts,

    pub completion_percentage: i64,

    /// The `status` query value, if one was given
    pub selected_status: Option<String>,

    /// Present only when a status filter was selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
}

/// Dashboard for the requester
///
/// Counts always cover all of the requester's tasks. The task list is only
/// included when a `status` parameter is present.
pub async fn index(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<IndexQuery>,
) -> ApiResult<Json<IndexResponse>> {
    let counts = Task::count_by_status(&state.db, auth.user_id).await?;

    let tasks = match query.status.as_deref() {
        Some(raw) => {
            let filter = TaskFilter {
                status: parse_status_filter(Some(raw))?,
                search: query.search.clone(),
                sort_by_deadline: query.sort.as_deref() == Some("deadline"),
            };
            Some(Task::list(&state.db, auth.user_id, &filter).await?)
        }
        None => None,
    };

    Ok(Json(IndexResponse {
        username: auth.username,
        counts,
        completion_percentage: counts.completion_percentage(),
        selected_status: query.status,
        tasks,
    }))
}

/// Status-only filter query
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// `GET /api/tasks`
pub async fn api_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let filter = TaskFilter {
        status: parse_status_filter(query.status.as_deref())?,
        ..Default::default()
    };

    let tasks = Task::list(&state.db, auth.user_id, &filter).await?;

    Ok(Json(tasks))
}

#[derive(Debug, Serialize)]
pub struct FilterTasksResponse {
    pub tasks: Vec<Task>,
    pub active_filter: String,
}

/// `GET /filter_tasks`
pub async fn filter_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<FilterTasksResponse>> {
    let filter = TaskFilter {
        status: parse_status_filter(query.status.as_deref())?,
        ..Default::default()
    };

    let tasks = Task::list(&state.db, auth.user_id, &filter).await?;

    let active_filter = query
        .status
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "all".to_string());

    Ok(Json(FilterTasksResponse {
        tasks,
        active_filter,
    }))
}

/// Create task request
#[derive(Debug, Deserialize)]
pub struct AddTaskRequest {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// `YYYY-MM-DD`; empty or absent means no deadline
    pub deadline: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub message: String,
    pub task: Task,
}

/// Creates a Pending task for the requester
///
/// # Errors
///
/// - `400 Bad Request`: Every failing check is reported together (missing
///   title, missing description, malformed or past deadline)
pub async fn add_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let mut errors = Vec::new();

    required("title", &req.title, "Task title is required", &mut errors);
    required(
        "description",
        &req.description,
        "Task description is required",
        &mut errors,
    );

    let today = Utc::now().date_naive();
    let deadline = match parse_deadline(req.deadline.as_deref(), today, true) {
        Ok(deadline) => deadline,
        Err(message) => {
            errors.push(ValidationErrorDetail {
                field: "deadline".to_string(),
                message,
            });
            None
        }
    };

    if !errors.is_empty() {
        return Err(ApiError::ValidationError(errors));
    }

    let task = Task::create(
        &state.db,
        auth.user_id,
        CreateTask {
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            deadline,
        },
    )
    .await?;

    info!(user_id = %auth.user_id, task_id = %task.id, "Task created");

    notify(
        &state,
        CreateNotification::new(
            auth.user_id,
            "Task added successfully!",
            NotificationKind::Success,
        )
        .for_task(task.id),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            message: "Task added successfully!".to_string(),
            task,
        }),
    ))
}

/// Update task request
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub task_id: Uuid,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub deadline: Option<String>,

    /// Keeps the current status when absent
    pub status: Option<String>,
}

/// Replaces a task's fields
///
/// Past deadlines are accepted here so existing overdue tasks stay editable.
///
/// # Errors
///
/// - `400 Bad Request`: Missing title/description, malformed deadline, unknown status
/// - `403 Forbidden`: The task does not exist or the requester does not own it
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let existing = Task::find_owned(&state.db, req.task_id, auth.user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %auth.user_id, task_id = %req.task_id, "Update denied");
            ApiError::Forbidden(NOT_OWNED.to_string())
        })?;

    let mut errors = Vec::new();

    required("title", &req.title, "Task title is required", &mut errors);
    required(
        "description",
        &req.description,
        "Task description is required",
        &mut errors,
    );

    let today = Utc::now().date_naive();
    let deadline = match parse_deadline(req.deadline.as_deref(), today, false) {
        Ok(deadline) => deadline,
        Err(message) => {
            errors.push(ValidationErrorDetail {
                field: "deadline".to_string(),
                message,
            });
            None
        }
    };

    let status = match req.status.as_deref().map(str::trim) {
        None | Some("") => existing.status,
        Some(raw) => match raw.parse::<TaskStatus>() {
            Ok(status) => status,
            Err(message) => {
                errors.push(ValidationErrorDetail {
                    field: "status".to_string(),
                    message,
                });
                existing.status
            }
        },
    };

    if !errors.is_empty() {
        return Err(ApiError::ValidationError(errors));
    }

    let task = Task::update(
        &state.db,
        req.task_id,
        auth.user_id,
        UpdateTask {
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            deadline,
            status,
        },
    )
    .await?
    .ok_or_else(|| ApiError::Forbidden(NOT_OWNED.to_string()))?;

    info!(user_id = %auth.user_id, task_id = %task.id, status = %task.status, "Task updated");

    for shared_user in &task.shared_with {
        notify(
            &state,
            CreateNotification::new(
                *shared_user,
                format!("Task '{}' was updated by {}", task.title, auth.username),
                NotificationKind::Info,
            )
            .for_task(task.id),
        )
        .await;
    }

    Ok(Json(TaskResponse {
        message: "Task updated successfully".to_string(),
        task,
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteTaskResponse {
    pub message: String,
    pub task_id: Uuid,
}

/// Deletes a task with its attachments
///
/// # Errors
///
/// - `403 Forbidden`: The task does not exist or the requester does not own it
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<DeleteTaskResponse>> {
    if Task::find_owned(&state.db, task_id, auth.user_id)
        .await?
        .is_none()
    {
        warn!(user_id = %auth.user_id, task_id = %task_id, "Delete denied");
        return Err(ApiError::Forbidden(NOT_OWNED.to_string()));
    }

    let attachments = Attachment::list_by_task(&state.db, task_id).await?;

    let task = Task::delete_owned(&state.db, task_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden(NOT_OWNED.to_string()))?;

    for attachment in &attachments {
        let key = object_key(task.user_id, &attachment.stored_filename);
        if let Err(e) = state.store.delete(&key).await {
            warn!(error = %e, key = %key, "Failed to remove attachment file");
        }
    }

    info!(
        user_id = %auth.user_id,
        task_id = %task_id,
        attachments = attachments.len(),
        "Task deleted"
    );

    // The task row is gone, so these notifications carry no task reference.
    for shared_user in &task.shared_with {
        notify(
            &state,
            CreateNotification::new(
                *shared_user,
                format!("Task '{}' was deleted by {}", task.title, auth.username),
                NotificationKind::Warning,
            ),
        )
        .await;
    }

    Ok(Json(DeleteTaskResponse {
        message: "Task deleted successfully".to_string(),
        task_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_all_means_none() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(parse_status_filter(Some("")).unwrap(), None);
        assert_eq!(parse_status_filter(Some("all")).unwrap(), None);
    }

    #[test]
    fn test_status_filter_parses_labels() {
        assert_eq!(
            parse_status_filter(Some("In Progress")).unwrap(),
            Some(TaskStatus::InProgress)
        );
        assert_eq!(
            parse_status_filter(Some("Completed")).unwrap(),
            Some(TaskStatus::Completed)
        );
    }

    #[test]
    fn test_status_filter_rejects_unknown() {
        let err = parse_status_filter(Some("Done")).unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(ref d) if d[0].field == "status"));
    }

    #[test]
    fn test_required_collects_errors() {
        let mut errors = Vec::new();
        required("title", "  ", "Task title is required", &mut errors);
        required("description", "text", "Task description is required", &mut errors);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Task title is required");
    }

    #[test]
    fn test_add_task_request_defaults() {
        let req: AddTaskRequest = serde_json::from_str(r#"{"title":"A"}"#).unwrap();
        assert_eq!(req.title, "A");
        assert!(req.description.is_empty());
        assert!(req.deadline.is_none());
    }
}
