/// Database models for TaskDeck
///
/// Each model is a typed record plus the SQL operations over its table.
///
/// # Models
///
/// - `user`: User accounts
/// - `task`: Tasks, their status filter/search/sort, and sharing
/// - `attachment`: File metadata attached to tasks
/// - `notification`: Per-user notification log
/// - `analytics`: Read-only aggregations over a user's tasks
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::models::user::{User, CreateUser};
/// use taskdeck_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     username: "alice".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod analytics;
pub mod attachment;
pub mod notification;
pub mod task;
pub mod user;
