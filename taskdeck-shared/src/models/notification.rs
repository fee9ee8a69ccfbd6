/// Notification model and database operations
///
/// Notifications are an append-only per-user log. The only mutation is
/// flipping the `read` flag; rows are otherwise deleted individually, in
/// bulk, or by cascade when the recipient is deleted. Every operation that
/// touches existing rows is scoped to the recipient.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE notification_kind AS ENUM ('info', 'success', 'warning', 'danger');
///
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     message TEXT NOT NULL,
///     kind notification_kind NOT NULL DEFAULT 'info',
///     read BOOLEAN NOT NULL DEFAULT FALSE,
///     task_id UUID REFERENCES tasks(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Number of notifications returned by the default listing
pub const RECENT_LIMIT: i64 = 20;

/// Number of notifications returned by the full listing
pub const ALL_LIMIT: i64 = 100;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Danger,
}

/// A notification record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    pub message: String,

    #[serde(rename = "type")]
    pub kind: NotificationKind,

    pub read: bool,

    /// Related task, if any (cleared when the task is deleted)
    pub task_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub task_id: Option<Uuid>,
}

impl CreateNotification {
    /// Builds a notification for `user_id`
    pub fn new(user_id: Uuid, message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            user_id,
            message: message.into(),
            kind,
            task_id: None,
        }
    }

    /// Links the notification to a task
    pub fn for_task(mut self, task_id: Uuid) -> Self {
        self.task_id = Some(task_id);
        self
    }
}

impl Notification {
    /// Stores a new unread notification
    pub async fn create(pool: &PgPool, data: CreateNotification) -> Result<Self, sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, message, kind, task_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, message, kind, read, task_id, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.message)
        .bind(data.kind)
        .bind(data.task_id)
        .fetch_one(pool)
        .await?;

        Ok(notification)
    }

    /// Lists a user's notifications, newest first, at most `limit`
    pub async fn list_recent(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, message, kind, read, task_id, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(notifications)
    }

    /// Counts a user's unread notifications
    pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Marks one of the user's notifications read
    ///
    /// # Returns
    ///
    /// `true` if the notification exists and belongs to `user_id`
    pub async fn mark_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks all of the user's unread notifications read
    ///
    /// # Returns
    ///
    /// The number of notifications that were unread
    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes one of the user's notifications
    pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes all of the user's notifications
    ///
    /// # Returns
    ///
    /// The number of notifications deleted
    pub async fn delete_all(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
