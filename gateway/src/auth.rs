//! Mock officer login
//!
//! Any non-empty username/password pair is accepted and handed a throwaway
//! token. There is no credential store behind this.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::{ok, ApiError, ApiResult};
use crate::AppState;

pub const TOKEN_PREFIX: &str = "mock-token-";

#[derive(Deserialize, Default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: OfficerProfile,
}

#[derive(Serialize)]
pub struct OfficerProfile {
    pub name: &'static str,
    pub role: &'static str,
}

const OFFICER: OfficerProfile = OfficerProfile {
    name: "Officer Arjun",
    role: "admin",
};

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.is_empty())
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    // Unreadable bodies count as missing credentials
    let req = payload.map(|Json(req)| req).unwrap_or_default();

    if !(present(&req.username) && present(&req.password)) {
        return Err(ApiError::Unauthorized);
    }

    tracing::info!(username = req.username.as_deref().unwrap_or_default(), "Officer login");
    ok(LoginResponse {
        token: format!("{TOKEN_PREFIX}{}", state.registry.clock().now_millis()),
        user: OFFICER,
    })
}
