/// Middleware for the API server
///
/// - `security`: Security response headers
/// - `session`: Session gates for JSON and page routes

pub mod security;
pub mod session;
