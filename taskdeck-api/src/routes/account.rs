/// Account deletion
///
/// Removes the user's row (tasks, attachment metadata and notifications
/// cascade), their entries in other users' shared-with lists, and their
/// upload directory. The session cookie is cleared.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::without_session_cookie,
};
use axum::{extract::State, Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use taskdeck_shared::{
    auth::middleware::AuthContext, models::user::User, storage::owner_prefix,
};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct DeleteAccountResponse {
    pub message: String,
}

/// `POST /delete_account` and `DELETE /delete_account`
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<DeleteAccountResponse>)> {
    let unshared = User::remove_from_all_shares(&state.db, auth.user_id).await?;

    if !User::delete(&state.db, auth.user_id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    if let Err(e) = state.store.delete_prefix(&owner_prefix(auth.user_id)).await {
        warn!(error = %e, user_id = %auth.user_id, "Failed to remove upload directory");
    }

    info!(user_id = %auth.user_id, unshared, "Account deleted");

    Ok((
        without_session_cookie(jar),
        Json(DeleteAccountResponse {
            message: "Account deleted".to_string(),
        }),
    ))
}
