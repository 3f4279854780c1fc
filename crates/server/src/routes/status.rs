use axum::{extract::Path, Extension, Json};
use crowd_engine::{SessionSnapshot, Standing};
use serde_json::{json, Value as JsonValue};
use tokio::sync::watch;

use crate::error::AppError;

type Snapshots = watch::Receiver<SessionSnapshot>;

fn current(snapshots: &Snapshots) -> Result<SessionSnapshot, AppError> {
    // Err only once the session loop has dropped its sender.
    if snapshots.has_changed().is_err() {
        return Err(AppError::Unavailable("Session has stopped".to_string()));
    }
    Ok(snapshots.borrow().clone())
}

/// GET /health
pub async fn health_check() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/status
pub async fn get_status(Extension(snapshots): Extension<Snapshots>) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(current(&snapshots)?))
}

/// GET /api/leaderboard
pub async fn get_leaderboard(Extension(snapshots): Extension<Snapshots>) -> Result<Json<Vec<Standing>>, AppError> {
    Ok(Json(current(&snapshots)?.leaderboard))
}

/// GET /api/leaderboard/{author}
pub async fn get_author_points(
    Path(author): Path<String>,
    Extension(snapshots): Extension<Snapshots>,
) -> Result<Json<Standing>, AppError> {
    current(&snapshots)?
        .leaderboard
        .into_iter()
        .find(|s| s.author == author)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No points recorded for {author}")))
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
