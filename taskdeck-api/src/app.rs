/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskdeck_api::{app::{build_router, AppState}, config::Config};
/// use taskdeck_shared::{realtime::NotificationHub, storage::LocalDiskStore};
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let store = Arc::new(LocalDiskStore::new(config.uploads.dir.clone()));
/// let state = AppState::new(pool, config, store, NotificationHub::default());
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        security::SecurityHeadersLayer,
        session::{require_page_session, require_session},
    },
    routes,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskdeck_shared::{realtime::NotificationHub, storage::AttachmentStore};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Room on top of the upload ceiling for multipart framing
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Attachment file store
    pub store: Arc<dyn AttachmentStore>,

    /// Per-user push channel
    pub hub: NotificationHub,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Config,
        store: Arc<dyn AttachmentStore>,
        hub: NotificationHub,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            store,
            hub,
        }
    }

    /// Secret for signing and validating session tokens
    pub fn session_secret(&self) -> &str {
        &self.config.session.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /health                                   public
/// /login, /register (GET, POST), /logout    public
/// /, /filter_tasks                          page session (redirect to /login)
/// /api/tasks, /add_task, /update,
/// /delete_task/:id                          api session (401)
/// /tasks/:id/share, /tasks/shared,
/// /tasks/shared/:id/remove                  api session
/// /tasks/:id/attachments[/:filename]        api session
/// /shared/tasks/:id/attachments[/:filename] api session
/// /notifications/...                        api session
/// /analytics/...                            api session
/// /delete_account                           api session
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost last):
/// 1. Session gate (per route group)
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
/// 4. Security headers
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.uploads.max_bytes + MULTIPART_OVERHEAD_BYTES;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/login",
            get(routes::auth::login_page).post(routes::auth::login),
        )
        .route(
            "/register",
            get(routes::auth::register_page).post(routes::auth::register),
        )
        .route("/logout", post(routes::auth::logout));

    let page_routes = Router::new()
        .route("/", get(routes::tasks::index))
        .route("/filter_tasks", get(routes::tasks::filter_tasks))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_page_session,
        ));

    let api_routes = Router::new()
        // Tasks
        .route("/api/tasks", get(routes::tasks::api_tasks))
        .route("/add_task", post(routes::tasks::add_task))
        .route("/update", post(routes::tasks::update_task))
        .route("/delete_task/:id", post(routes::tasks::delete_task))
        // Sharing
        .route("/tasks/:id/share", post(routes::sharing::share_task))
        .route("/tasks/shared", get(routes::sharing::shared_tasks))
        .route(
            "/tasks/shared/:id/remove",
            delete(routes::sharing::remove_shared_task),
        )
        // Attachments
        .route(
            "/tasks/:id/attachments",
            post(routes::attachments::upload_attachment)
                .get(routes::attachments::list_attachments)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/tasks/:id/attachments/:filename",
            get(routes::attachments::download_attachment)
                .delete(routes::attachments::delete_attachment),
        )
        .route(
            "/shared/tasks/:id/attachments",
            get(routes::attachments::list_shared_attachments),
        )
        .route(
            "/shared/tasks/:id/attachments/:filename",
            get(routes::attachments::download_shared_attachment),
        )
        // Notifications
        .route("/notifications", get(routes::notifications::list_notifications))
        .route(
            "/notifications/all",
            get(routes::notifications::list_all_notifications),
        )
        .route(
            "/notifications/unread_count",
            get(routes::notifications::unread_count),
        )
        .route(
            "/notifications/stream",
            get(routes::notifications::notification_stream),
        )
        .route(
            "/notifications/read_all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/notifications/delete_all",
            delete(routes::notifications::delete_all_notifications),
        )
        .route(
            "/notifications/:id/read",
            post(routes::notifications::mark_read),
        )
        .route(
            "/notifications/:id",
            delete(routes::notifications::delete_notification),
        )
        // Analytics
        .route("/analytics/summary", get(routes::analytics::summary))
        .route("/analytics/trends", get(routes::analytics::trends))
        .route(
            "/analytics/distribution",
            get(routes::analytics::distribution),
        )
        // Account
        .route(
            "/delete_account",
            post(routes::account::delete_account).delete(routes::account::delete_account),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(page_routes)
        .merge(api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
