use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::models::{AuthResponse, LoginRequest, ProfileUpdate, RegisterRequest, UserResponse};
use crate::server::{
    config::AppState,
    error::ApiError,
    extract::{ApiJson, AuthUser},
};

pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    info!("Registration attempt for {}", request.email);
    let (user, token) = state.auth.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (user, token) = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(AuthResponse {
        success: true,
        token,
        user,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth.me(user.id).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth.update_profile(user.id, update).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}
