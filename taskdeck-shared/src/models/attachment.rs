/// Attachment metadata
///
/// One row per uploaded file. The bytes themselves live in the attachment
/// store under the task owner's directory; see [`crate::storage`].
///
/// ```sql
/// CREATE TABLE task_attachments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     stored_filename VARCHAR(255) NOT NULL,
///     original_filename VARCHAR(255) NOT NULL,
///     size_bytes BIGINT NOT NULL,
///     mime_type VARCHAR(255) NOT NULL,
///     uploaded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (task_id, stored_filename)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Metadata for a file attached to a task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: Uuid,

    pub task_id: Uuid,

    /// Name on disk (sanitized stem, timestamp suffix, extension)
    pub stored_filename: String,

    /// Name the file was uploaded with
    pub original_filename: String,

    pub size_bytes: i64,

    /// MIME type declared by the client
    pub mime_type: String,

    pub uploaded_at: DateTime<Utc>,
}

/// Input for recording a stored file
#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub task_id: Uuid,
    pub stored_filename: String,
    pub original_filename: String,
    pub size_bytes: i64,
    pub mime_type: String,
}

impl Attachment {
    /// Records an uploaded file against its task
    pub async fn create(pool: &PgPool, data: CreateAttachment) -> Result<Self, sqlx::Error> {
        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO task_attachments
                (task_id, stored_filename, original_filename, size_bytes, mime_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, task_id, stored_filename, original_filename, size_bytes,
                      mime_type, uploaded_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.stored_filename)
        .bind(data.original_filename)
        .bind(data.size_bytes)
        .bind(data.mime_type)
        .fetch_one(pool)
        .await?;

        Ok(attachment)
    }

    /// Lists a task's attachments in upload order
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let attachments = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, stored_filename, original_filename, size_bytes,
                   mime_type, uploaded_at
            FROM task_attachments
            WHERE task_id = $1
            ORDER BY uploaded_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(attachments)
    }

    /// Finds an attachment by its stored filename
    pub async fn find(
        pool: &PgPool,
        task_id: Uuid,
        stored_filename: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, stored_filename, original_filename, size_bytes,
                   mime_type, uploaded_at
            FROM task_attachments
            WHERE task_id = $1 AND stored_filename = $2
            "#,
        )
        .bind(task_id)
        .bind(stored_filename)
        .fetch_optional(pool)
        .await?;

        Ok(attachment)
    }

    /// Deletes an attachment's metadata row
    ///
    /// # Returns
    ///
    /// `true` if a row was deleted
    pub async fn delete(
        pool: &PgPool,
        task_id: Uuid,
        stored_filename: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM task_attachments WHERE task_id = $1 AND stored_filename = $2",
        )
        .bind(task_id)
        .bind(stored_filename)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
