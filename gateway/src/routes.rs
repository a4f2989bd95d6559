use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use tourist_registry::{
    EmergencyReport, LocationUpdate, NewEmergency, NewTourist, RiskLevel, SystemCounters, Tourist,
};

use crate::api::{body_or_default, ok, ApiResult};
use crate::{auth, AppState};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub tourist_id: String,
    /// Same digest as `fingerprint`; the name the frontend reads
    pub blockchain_hash: String,
    pub fingerprint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub safety_alert: &'static str,
}

pub async fn register_tourist(
    State(state): State<AppState>,
    payload: Result<Json<NewTourist>, JsonRejection>,
) -> ApiResult<RegisterResponse> {
    let req = body_or_default(payload)?;
    let registration = state.registry.register_tourist(req).await?;

    ok(RegisterResponse {
        tourist_id: registration.tourist_id,
        blockchain_hash: registration.fingerprint.clone(),
        fingerprint: registration.fingerprint,
    })
}

pub async fn live_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<LocationUpdate>, JsonRejection>,
) -> ApiResult<LocationResponse> {
    let update = body_or_default(payload)?;
    let risk = state.registry.record_location(&id, update).await?;

    ok(LocationResponse {
        risk_score: risk.score,
        risk_level: risk.level,
        safety_alert: risk.message,
    })
}

pub async fn record_emergency(
    State(state): State<AppState>,
    payload: Result<Json<NewEmergency>, JsonRejection>,
) -> ApiResult<EmergencyReport> {
    let req = body_or_default(payload)?;
    ok(state.registry.record_emergency(req).await?)
}

/// Counters never fail; an unreadable store reports zeros
pub async fn stats(State(state): State<AppState>) -> ApiResult<SystemCounters> {
    ok(state.registry.stats().await)
}

pub async fn verify_tourist(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<Tourist> {
    ok(state.registry.verify(&hash).await?)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "suraksha-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/login", post(auth::login))
        .route("/registerTourist", post(register_tourist))
        .route("/liveLocation/:id", post(live_location))
        .route("/recordEmergency", post(record_emergency))
        .route("/stats", get(stats))
        .route("/verifyTourist/:hash", get(verify_tourist))
        .with_state(state)
}

/// Health probe plus the `/api` surface, without CORS or static files
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes(state))
}
