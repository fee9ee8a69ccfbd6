/// Per-request identity for Axum handlers
///
/// Every protected request re-validates its session: the token is read from
/// the `Authorization: Bearer <token>` header or, failing that, from the
/// session cookie, then validated. On success an [`AuthContext`] is inserted
/// into the request extensions, so handlers receive identity explicitly
/// instead of reading global session state. The API crate's gates build
/// on [`authenticate`].
///
/// # Example
///
/// ```
/// use axum::http::HeaderMap;
/// use taskdeck_shared::auth::middleware::{authenticate, AuthError};
///
/// let headers = HeaderMap::new();
/// assert!(matches!(
///     authenticate(&headers, "secret"),
///     Err(AuthError::MissingCredentials)
/// ));
/// ```

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::{validate_token, JwtError, SessionClaims};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "taskdeck_session";

/// Identity of the user making the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Username recorded in the session
    pub username: String,
}

impl AuthContext {
    /// Creates auth context from validated session claims
    pub fn from_claims(claims: &SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username.clone(),
        }
    }
}

/// Error type for session authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session token in the request
    #[error("authentication required")]
    MissingCredentials,

    /// Authorization header present but malformed
    #[error("invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("invalid session: {0}")]
    InvalidToken(String),
}

/// Finds the raw session token in request headers
///
/// The `Authorization` header takes precedence over the session cookie.
///
/// # Errors
///
/// - `AuthError::InvalidFormat` if the Authorization header is not a Bearer token
/// - `AuthError::MissingCredentials` if neither source carries a token
pub fn extract_session_token(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidFormat("Invalid authorization header".to_string()))?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;
        return Ok(token.trim().to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingCredentials)
}

/// Extracts and validates the session carried by a request
///
/// # Errors
///
/// Returns an [`AuthError`] if no token is present or it fails validation
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = extract_session_token(headers)?;

    let claims = validate_token(&token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Session expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid session: {}", e)),
    })?;

    Ok(AuthContext::from_claims(&claims))
}
