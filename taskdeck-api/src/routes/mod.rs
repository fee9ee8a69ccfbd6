/// Route handlers, organized by resource:
///
/// - `health`: Health check
/// - `auth`: Register, login, logout
/// - `tasks`: Task listing and CRUD
/// - `sharing`: Sharing tasks with other users
/// - `attachments`: File uploads and downloads
/// - `notifications`: Notification log and push stream
/// - `analytics`: Task statistics
/// - `account`: Account deletion

pub mod account;
pub mod analytics;
pub mod attachments;
pub mod auth;
pub mod health;
pub mod notifications;
pub mod sharing;
pub mod tasks;
