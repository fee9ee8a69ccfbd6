/// Session gates and session cookie helpers
///
/// Two gates wrap protected routes:
///
/// - [`require_session`] answers 401 JSON when the session is missing or
///   invalid (API routes)
/// - [`require_page_session`] redirects to `/login` instead (page routes)
///
/// Both validate the session token on every request and insert an
/// [`AuthContext`] into the request extensions.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use taskdeck_shared::{
    auth::middleware::{authenticate, AuthContext, SESSION_COOKIE},
    models::user::User,
};
use tracing::debug;

use crate::{app::AppState, error::ApiError};

/// Validates the session and checks the account still exists
pub(crate) async fn resolve_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthContext, ApiError> {
    let auth = authenticate(headers, state.session_secret())?;

    if User::find_by_id(&state.db, auth.user_id).await?.is_none() {
        debug!(user_id = %auth.user_id, "Session refers to a deleted account");
        return Err(ApiError::Unauthorized("Account no longer exists".to_string()));
    }

    Ok(auth)
}

/// Session gate for JSON API routes
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = resolve_session(&state, req.headers()).await?;
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// Session gate for page routes; unauthenticated visitors go to `/login`
pub async fn require_page_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let resolved = resolve_session(&state, req.headers()).await;

    match resolved {
        Ok(auth) => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(ApiError::InternalError(msg)) => ApiError::InternalError(msg).into_response(),
        Err(_) => Redirect::to("/login").into_response(),
    }
}

/// Adds the session cookie carrying `token`
pub fn with_session_cookie(jar: CookieJar, token: String, secure: bool) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);

    jar.add(cookie)
}

/// Removes the session cookie
pub fn without_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let jar = with_session_cookie(CookieJar::new(), "tok".to_string(), true);
        let cookie = jar.get(SESSION_COOKIE).unwrap();

        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_remove_session_cookie() {
        let jar = with_session_cookie(CookieJar::new(), "tok".to_string(), false);
        let jar = without_session_cookie(jar);

        assert!(jar.get(SESSION_COOKIE).is_none());
    }
}
