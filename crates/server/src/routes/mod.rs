pub mod status;

use axum::{routing::get, Extension, Router};
use crowd_engine::SessionSnapshot;
use tokio::sync::watch;

/// Read-only status API over the session's published snapshots.
pub fn router(snapshots: watch::Receiver<SessionSnapshot>) -> Router {
    Router::new()
        .route("/health", get(status::health_check))
        .route("/api/status", get(status::get_status))
        .route("/api/leaderboard", get(status::get_leaderboard))
        .route("/api/leaderboard/{author}", get(status::get_author_points))
        .fallback(status::not_found)
        .layer(Extension(snapshots))
}
