use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::database::connection::DatabaseManager;
use crate::database::models::{InboxEntry, MessageTemplate, Target};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub broadcast: BroadcastHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub response_time_ms: u64,
}

/// Snapshot of what the next broadcast would work with.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BroadcastHealth {
    pub targets: i64,
    pub messages: i64,
    pub unread_inbox: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub start_time: DateTime<Utc>,
}

pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        let state = AppState {
            db,
            start_time: Utc::now(),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        Self { router }
    }
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    let start = std::time::Instant::now();

    if state.db.ping().await.is_err() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let response_time_ms = start.elapsed().as_millis() as u64;

    let broadcast = match collect_counts(&state.db).await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::warn!("Health check could not read counts: {}", e);
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
    };

    let uptime = Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: "healthy".to_string(),
            connection_pool_size: state.db.pool.size(),
            response_time_ms,
        },
        broadcast,
        uptime_seconds: uptime,
    }))
}

async fn readiness_check(State(state): State<AppState>) -> Result<Json<&'static str>, StatusCode> {
    match state.db.ping().await {
        Ok(_) => Ok(Json("ready")),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn liveness_check() -> Json<&'static str> {
    Json("alive")
}

async fn collect_counts(db: &DatabaseManager) -> Result<BroadcastHealth, sqlx::Error> {
    Ok(BroadcastHealth {
        targets: Target::count(&db.pool).await?,
        messages: MessageTemplate::count(&db.pool).await?,
        unread_inbox: InboxEntry::count_unread(&db.pool).await?,
    })
}
