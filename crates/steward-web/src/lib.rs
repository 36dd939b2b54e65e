//! `steward-web` — public read-only HTTP surface.
//!
//! Serves the community leaderboard straight off the same SQLite file the
//! tracker writes, plus a liveness probe. No mutation endpoints.

use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use steward_core::config::Rank;
use steward_tracker::level::{level_for_xp, rank_for_level};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

pub struct WebState {
    pub db: Mutex<Connection>,
    pub ranks: Vec<Rank>,
}

pub fn build_router(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(state: Arc<WebState>, bind: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "web surface listening");
    axum::serve(listener, build_router(state)).await
}

/// GET /health — liveness probe, returns server metadata.
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct LeaderboardParams {
    limit: Option<usize>,
}

/// GET /leaderboard?limit=N — most active members, XP descending.
async fn leaderboard_handler(
    State(state): State<Arc<WebState>>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Value>, StatusCode> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let rows = {
        let conn = state.db.lock().unwrap();
        steward_tracker::db::top(&conn, limit)
    };
    match rows {
        Ok(rows) => Ok(Json(json!(leaderboard_entries(&rows, &state.ranks)))),
        Err(e) => {
            warn!(error = %e, "leaderboard query failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn leaderboard_entries(rows: &[(u64, i64)], ranks: &[Rank]) -> Vec<Value> {
    rows.iter()
        .map(|&(user_id, xp)| {
            let level = level_for_xp(xp);
            json!({
                // Stringified so 64-bit ids survive JS number parsing.
                "user_id": user_id.to_string(),
                "xp": xp,
                "level": level,
                "rank": rank_for_level(ranks, level).map(|r| r.title.clone()),
            })
        })
        .collect()
}
