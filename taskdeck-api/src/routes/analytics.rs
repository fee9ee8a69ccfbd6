/// Analytics endpoints over the requester's own tasks
///
/// "Today" is the current UTC date.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    auth::middleware::AuthContext,
    models::analytics::{self, AnalyticsSummary, StatusShare, TrendPoint, TrendWindow},
};

/// `GET /analytics/summary`
pub async fn summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AnalyticsSummary>> {
    let today = Utc::now().date_naive();
    let summary = analytics::summary(&state.db, auth.user_id, today).await?;

    Ok(Json(summary))
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendsQuery {
    /// `7` (default) or `30`
    pub days: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub days: i64,
    pub trends: Vec<TrendPoint>,
}

/// Daily created/completed counts over the trailing 7 or 30 days
///
/// # Errors
///
/// - `400 Bad Request`: `days` is neither 7 nor 30
pub async fn trends(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TrendsQuery>,
) -> ApiResult<Json<TrendsResponse>> {
    let window =
        TrendWindow::parse(query.days.as_deref()).map_err(|msg| ApiError::validation("days", msg))?;

    let today = Utc::now().date_naive();
    let trends = analytics::trends(&state.db, auth.user_id, window, today).await?;

    Ok(Json(TrendsResponse {
        days: window.days(),
        trends,
    }))
}

/// `GET /analytics/distribution`
pub async fn distribution(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<StatusShare>>> {
    let shares = analytics::status_distribution(&state.db, auth.user_id).await?;

    Ok(Json(shares))
}
