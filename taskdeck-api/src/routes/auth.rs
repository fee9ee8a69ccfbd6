/// Authentication endpoints
///
/// # Endpoints
///
/// - `GET /login`, `GET /register` - Session probe (redirects home when signed in)
/// - `POST /register` - Create an account and sign in
/// - `POST /login` - Sign in
/// - `POST /logout` - Sign out
///
/// A successful register or login sets the `taskdeck_session` cookie and
/// also returns the token for API clients.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::{resolve_session, with_session_cookie, without_session_cookie},
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use taskdeck_shared::{
    auth::{
        password,
        session::{create_token, SessionClaims},
    },
    models::user::{validate_username, CreateUser, User, UserProfile},
};
use tracing::{info, warn};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub confirm_password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Register and login response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub user: UserProfile,

    /// Session token (also set as a cookie)
    pub token: String,
}

fn issue_session(state: &AppState, user: &User) -> ApiResult<String> {
    let claims = SessionClaims::with_expiration(
        user.id,
        user.username.clone(),
        chrono::Duration::minutes(state.config.session.ttl_minutes),
    );

    Ok(create_token(&claims, state.session_secret())?)
}

/// Sends visitors with a live session to `/`
async fn session_probe(state: &AppState, headers: &HeaderMap) -> Response {
    match resolve_session(state, headers).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(ApiError::InternalError(msg)) => ApiError::InternalError(msg).into_response(),
        Err(_) => Json(json!({ "authenticated": false })).into_response(),
    }
}

/// `GET /login`
pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    session_probe(&state, &headers).await
}

/// `GET /register`
pub async fn register_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    session_probe(&state, &headers).await
}

/// Registers a new user and signs them in
///
/// # Errors
///
/// - `400 Bad Request`: Passwords differ, password shorter than 8 characters,
///   or username not 3-50 characters
/// - `409 Conflict`: Username already exists
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(CookieJar, (StatusCode, Json<SessionResponse>))> {
    req.validate()?;

    password::validate_new_password(&req.password, &req.confirm_password)
        .map_err(|msg| ApiError::validation("password", msg))?;

    let username =
        validate_username(&req.username).map_err(|msg| ApiError::validation("username", msg))?;

    if User::username_exists(&state.db, &username).await? {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username,
            password_hash,
        },
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "User registered");

    let token = issue_session(&state, &user)?;
    let jar = with_session_cookie(jar, token.clone(), state.config.api.production);

    Ok((
        jar,
        (
            StatusCode::CREATED,
            Json(SessionResponse {
                message: "Registration successful".to_string(),
                user: UserProfile::from(&user),
                token,
            }),
        ),
    ))
}

/// Signs a user in
///
/// # Errors
///
/// - `400 Bad Request`: Missing username or password
/// - `401 Unauthorized`: Unknown user or wrong password (same message for both)
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    req.validate()?;

    let user = match User::find_by_username(&state.db, req.username.trim()).await? {
        Some(user) => user,
        None => {
            warn!(username = %req.username.trim(), "Login for unknown user");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "Login with wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    info!(user_id = %user.id, "User logged in");

    let token = issue_session(&state, &user)?;
    let jar = with_session_cookie(jar, token.clone(), state.config.api.production);

    Ok((
        jar,
        Json(SessionResponse {
            message: "Login successful".to_string(),
            user: UserProfile::from(&user),
            token,
        }),
    ))
}

/// Clears the session cookie
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        without_session_cookie(jar),
        Json(json!({ "message": "Logged out" })),
    )
}
