//! # TaskDeck Shared Library
//!
//! This crate contains the data layer and auth primitives used by the
//! TaskDeck API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their operations
//! - `auth`: Password hashing, session tokens, request identity
//! - `db`: Connection pool and migrations
//! - `storage`: Attachment file storage
//! - `realtime`: Per-user notification fan-out

pub mod auth;
pub mod db;
pub mod models;
pub mod realtime;
pub mod storage;

/// Current version of the TaskDeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
