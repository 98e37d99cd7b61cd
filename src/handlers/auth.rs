use axum::{
    Json,
    extract::{Path, State},
};

use crate::middleware::ApiJson;
use crate::router::StorefrontState;
use crate::service::authenticate;
use crate::types::api::{
    LoginRequest, LoginResponse, Profile, ProfileResponse, Settings, SettingsResponse,
};
use crate::StorefrontError;

/// POST /login
pub async fn login(
    State(state): State<StorefrontState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, StorefrontError> {
    let account = authenticate(&state.store, &req.username, &req.password).await?;
    Ok(Json(LoginResponse {
        success: true,
        role: account.role,
        username: account.username,
    }))
}

/// GET /profile/{username}
pub async fn profile(
    State(state): State<StorefrontState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, StorefrontError> {
    let account = state
        .store
        .find_account(&username)
        .await?
        .ok_or_else(|| StorefrontError::NotFound("User not found".to_string()))?;
    Ok(Json(ProfileResponse {
        success: true,
        profile: Profile {
            username: account.username,
            role: account.role,
        },
    }))
}

/// GET /settings/{username}
pub async fn settings(Path(_username): Path<String>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        success: true,
        settings: Settings::default(),
    })
}
