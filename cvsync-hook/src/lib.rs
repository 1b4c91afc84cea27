//! cvsync-hook library - webhook receiver for event platform notifications
//!
//! Each accepted event is applied to the on-disk record store under a
//! process-wide lock, so two events never interleave their load/save cycles.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use cvsync_common::notify::Notifier;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod processing;

pub use error::{ApiError, ApiResult};

/// Where and how generated pages are written
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub output_dir: PathBuf,
    pub base_url: String,
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Root of the `sessions/` and `speakers/` collections
    pub data_dir: PathBuf,
    /// Expected value of the `Authorization` header
    pub auth_token: String,
    pub notifier: Arc<dyn Notifier>,
    /// Page generation after each change; disabled when `None`
    pub pages: Option<PageSettings>,
    /// Serializes load/reconcile/save for `data_dir`
    pub store_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, auth_token: String, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            data_dir,
            auth_token,
            notifier,
            pages: None,
            store_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_pages(mut self, pages: PageSettings) -> Self {
        self.pages = Some(pages);
        self
    }
}

/// Build application router
///
/// `/cvent-event` requires the auth header; `/health` does not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::get;

    let protected = Router::new()
        .route(
            "/cvent-event",
            get(api::check_auth).post(api::receive_event),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    Router::new()
        .merge(protected)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
