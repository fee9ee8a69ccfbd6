/// Task model and database operations
///
/// A task belongs to exactly one owner and is visible to that owner plus
/// every user listed in its `shared_with` array. Only the owner may change
/// or delete it.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('Pending', 'In Progress', 'Completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL,
///     deadline DATE,
///     status task_status NOT NULL DEFAULT 'Pending',
///     shared_with UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     completed_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::models::task::{Task, CreateTask, TaskFilter, TaskStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, owner, CreateTask {
///     title: "Write report".to_string(),
///     description: "Quarterly numbers".to_string(),
///     deadline: None,
/// }).await?;
///
/// let pending = Task::list(&pool, owner, &TaskFilter {
///     status: Some(TaskStatus::Pending),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Wire and storage format of task deadlines
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";

const TASK_COLUMNS: &str = "id, user_id, title, description, deadline, status, shared_with, \
                            created_at, updated_at, completed_at";

/// Task progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    Pending,

    #[sqlx(rename = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,

    Completed,
}

impl TaskStatus {
    /// All statuses in display order
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    /// Database/wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TaskStatus::Pending),
            "In Progress" => Ok(TaskStatus::InProgress),
            "Completed" => Ok(TaskStatus::Completed),
            other => Err(format!("Invalid status: {}", other)),
        }
    }
}

/// A task record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    pub title: String,

    pub description: String,

    /// Optional due date (`YYYY-MM-DD` on the wire)
    pub deadline: Option<NaiveDate>,

    pub status: TaskStatus,

    /// Users granted read access (never contains the owner or duplicates)
    pub shared_with: Vec<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Set when the status becomes Completed, cleared when it leaves it
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Checks whether `user_id` owns the task
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Checks whether `user_id` may read the task
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.shared_with.contains(&user_id)
    }
}

/// A task shared with the requester, with its owner's username
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SharedTask {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,

    /// Username of the task's owner
    pub owner_username: String,
}

/// Input for creating a task (already validated)
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
}

/// Input for replacing a task's editable fields (already validated)
#[derive(Debug, Clone)]
pub struct UpdateTask {
    pub title: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub status: TaskStatus,
}

/// Filter for listing a user's own tasks
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Exact status match (None = any)
    pub status: Option<TaskStatus>,

    /// Case-insensitive literal substring of the title
    pub search: Option<String>,

    /// Sort by deadline ascending (nulls last) instead of newest first
    pub sort_by_deadline: bool,
}

/// Per-status task counts for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskCounts {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

impl TaskCounts {
    /// Count for a single status
    pub fn for_status(&self, status: TaskStatus) -> i64 {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
        }
    }

    /// Completed share of all tasks as a whole percentage
    pub fn completion_percentage(&self) -> i64 {
        completion_percentage(self.completed, self.total)
    }
}

/// Rounds `completed / total * 100` to the nearest integer (0 when `total` is 0)
///
/// # Example
///
/// ```
/// use taskdeck_shared::models::task::completion_percentage;
///
/// assert_eq!(completion_percentage(1, 3), 33);
/// assert_eq!(completion_percentage(2, 3), 67);
/// assert_eq!(completion_percentage(0, 0), 0);
/// ```
pub fn completion_percentage(completed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }

    (completed as f64 / total as f64 * 100.0).round() as i64
}

/// Parses an optional `YYYY-MM-DD` deadline
///
/// Empty or whitespace-only input means "no deadline". When `reject_past` is
/// set, dates strictly before `today` are refused; today itself is accepted.
///
/// # Errors
///
/// - `"Invalid date format"` if the input does not parse
/// - `"Deadline cannot be in the past"` if it is before `today` and `reject_past` is set
pub fn parse_deadline(
    raw: Option<&str>,
    today: NaiveDate,
    reject_past: bool,
) -> Result<Option<NaiveDate>, String> {
    let raw = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(None),
    };

    let date = NaiveDate::parse_from_str(raw, DEADLINE_FORMAT)
        .map_err(|_| "Invalid date format".to_string())?;

    if reject_past && date < today {
        return Err("Deadline cannot be in the past".to_string());
    }

    Ok(Some(date))
}

/// Escapes `LIKE` wildcards so user input matches literally
///
/// # Example
///
/// ```
/// use taskdeck_shared::models::task::escape_like;
///
/// assert_eq!(escape_like("50%_done"), "50\\%\\_done");
/// ```
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Task {
    /// Creates a new Pending task owned by `owner`
    pub async fn create(pool: &PgPool, owner: Uuid, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (user_id, title, description, deadline) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(owner)
            .bind(data.title)
            .bind(data.description)
            .bind(data.deadline)
            .fetch_one(pool)
            .await?;

        Ok(task)
    }

    /// Finds a task by ID regardless of who can see it
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Finds a task only if `owner` owns it
    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        owner: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Finds a task only if `user_id` owns it or it is shared with them
    pub async fn find_visible(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND (user_id = $2 OR $2 = ANY(shared_with))",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Finds a task only if it is shared with `user_id` (owned tasks excluded)
    pub async fn find_shared_with(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id <> $2 AND $2 = ANY(shared_with)",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Lists `owner`'s tasks matching `filter`
    pub async fn list(
        pool: &PgPool,
        owner: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {} FROM tasks WHERE user_id = $1", TASK_COLUMNS);
        let mut bind_count = 1;

        if filter.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }

        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        if search.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND title ILIKE ${} ESCAPE '\\'", bind_count));
        }

        if filter.sort_by_deadline {
            query.push_str(" ORDER BY deadline ASC NULLS LAST, created_at DESC");
        } else {
            query.push_str(" ORDER BY created_at DESC");
        }

        let mut q = sqlx::query_as::<_, Task>(&query).bind(owner);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(pattern) = search {
            q = q.bind(pattern);
        }

        let tasks = q.fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Lists tasks other users have shared with `user_id`, newest first
    pub async fn list_shared_with(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<SharedTask>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, SharedTask>(
            r#"
            SELECT t.id, t.user_id, t.title, t.description, t.deadline, t.status,
                   t.shared_with, t.created_at, t.updated_at, t.completed_at,
                   u.username AS owner_username
            FROM tasks t
            JOIN users u ON u.id = t.user_id
            WHERE $1 = ANY(t.shared_with) AND t.user_id <> $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Replaces the editable fields of a task owned by `owner`
    ///
    /// Maintains `completed_at`: set on entering Completed (kept if already
    /// completed), cleared on leaving it.
    ///
    /// # Returns
    ///
    /// The updated task, or `None` if it does not exist or `owner` does not own it
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        owner: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET title = $3, \
                 description = $4, \
                 deadline = $5, \
                 status = $6, \
                 completed_at = CASE \
                     WHEN $6 = 'Completed'::task_status THEN COALESCE(completed_at, NOW()) \
                     ELSE NULL \
                 END, \
                 updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {}",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner)
            .bind(data.title)
            .bind(data.description)
            .bind(data.deadline)
            .bind(data.status)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Deletes a task owned by `owner`
    ///
    /// Attachment metadata cascades; related notifications keep their text
    /// but lose the task reference.
    ///
    /// # Returns
    ///
    /// The deleted task, or `None` if it does not exist or is not owned by `owner`
    pub async fn delete_owned(
        pool: &PgPool,
        id: Uuid,
        owner: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "DELETE FROM tasks WHERE id = $1 AND user_id = $2 RETURNING {}",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Adds `target` to the shared-with list of a task owned by `owner`
    ///
    /// Idempotent: an existing entry is left alone. The owner can never be
    /// added.
    ///
    /// # Returns
    ///
    /// `true` if `target` was added, `false` if nothing changed
    pub async fn share(
        pool: &PgPool,
        id: Uuid,
        owner: Uuid,
        target: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET shared_with = array_append(shared_with, $3),
                updated_at = NOW()
            WHERE id = $1
              AND user_id = $2
              AND user_id <> $3
              AND NOT ($3 = ANY(shared_with))
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(target)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes `user_id` from the shared-with list of a task they do not own
    ///
    /// # Returns
    ///
    /// `true` if the entry was removed, `false` if the task was not shared with them
    pub async fn unshare(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET shared_with = array_remove(shared_with, $2),
                updated_at = NOW()
            WHERE id = $1
              AND user_id <> $2
              AND $2 = ANY(shared_with)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts `owner`'s tasks in total and per status
    pub async fn count_by_status(pool: &PgPool, owner: Uuid) -> Result<TaskCounts, sqlx::Error> {
        let counts = sqlx::query_as::<_, TaskCounts>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'Pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'In Progress') AS in_progress,
                   COUNT(*) FILTER (WHERE status = 'Completed') AS completed
            FROM tasks
            WHERE user_id = $1
            "#,
        )
        .bind(owner)
        .fetch_one(pool)
        .await?;

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DEADLINE_FORMAT).unwrap()
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"Completed\"").unwrap(),
            TaskStatus::Completed
        );
    }

    #[test]
    fn test_status_from_str() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("in progress".parse::<TaskStatus>().is_err());
        assert!("Done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_completion_percentage() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(0, 5), 0);
        assert_eq!(completion_percentage(5, 5), 100);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(1, 6), 17);
    }

    #[test]
    fn test_task_counts() {
        let counts = TaskCounts {
            total: 4,
            pending: 1,
            in_progress: 1,
            completed: 2,
        };

        assert_eq!(counts.completion_percentage(), 50);
        assert_eq!(counts.for_status(TaskStatus::InProgress), 1);
        assert_eq!(TaskCounts::default().completion_percentage(), 0);
    }

    #[test]
    fn test_parse_deadline_empty_is_none() {
        let today = date("2025-03-10");
        assert_eq!(parse_deadline(None, today, true).unwrap(), None);
        assert_eq!(parse_deadline(Some(""), today, true).unwrap(), None);
        assert_eq!(parse_deadline(Some("   "), today, true).unwrap(), None);
    }

    #[test]
    fn test_parse_deadline_rejects_past() {
        let today = date("2025-03-10");
        let err = parse_deadline(Some("2025-03-09"), today, true).unwrap_err();
        assert_eq!(err, "Deadline cannot be in the past");
    }

    #[test]
    fn test_parse_deadline_accepts_today_and_future() {
        let today = date("2025-03-10");
        assert_eq!(
            parse_deadline(Some("2025-03-10"), today, true).unwrap(),
            Some(today)
        );
        assert_eq!(
            parse_deadline(Some("2026-01-01"), today, true).unwrap(),
            Some(date("2026-01-01"))
        );
    }

    #[test]
    fn test_parse_deadline_allows_past_when_updating() {
        let today = date("2025-03-10");
        assert_eq!(
            parse_deadline(Some("2020-01-01"), today, false).unwrap(),
            Some(date("2020-01-01"))
        );
    }

    #[test]
    fn test_parse_deadline_invalid_format() {
        let today = date("2025-03-10");
        for raw in ["10/03/2025", "2025-13-01", "tomorrow", "2025-02-30"] {
            assert_eq!(
                parse_deadline(Some(raw), today, true).unwrap_err(),
                "Invalid date format"
            );
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_visibility() {
        let owner = Uuid::new_v4();
        let friend = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let now = Utc::now();

        let task = Task {
            id: Uuid::new_v4(),
            user_id: owner,
            title: "A".to_string(),
            description: "B".to_string(),
            deadline: None,
            status: TaskStatus::Pending,
            shared_with: vec![friend],
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        assert!(task.is_owned_by(owner));
        assert!(!task.is_owned_by(friend));
        assert!(task.is_visible_to(owner));
        assert!(task.is_visible_to(friend));
        assert!(!task.is_visible_to(stranger));
    }

    #[test]
    fn test_task_serializes_deadline_as_date() {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "A".to_string(),
            description: "B".to_string(),
            deadline: Some(date("2025-12-31")),
            status: TaskStatus::InProgress,
            shared_with: vec![],
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["deadline"], "2025-12-31");
        assert_eq!(json["status"], "In Progress");
    }
}
