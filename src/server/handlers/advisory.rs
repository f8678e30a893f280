use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::models::{
    Advisory, AdvisoryList, AdvisoryQuery, AdvisoryUpdate, LikesResponse, MessageResponse,
    NewAdvisory,
};
use crate::server::{
    config::AppState,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery, AuthUser},
};

pub async fn list_advisories(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiQuery(query): ApiQuery<AdvisoryQuery>,
) -> Result<Json<AdvisoryList>, ApiError> {
    let page = state.advisory.list(&query).await?;
    Ok(Json(page.into()))
}

pub async fn create_advisory(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(input): ApiJson<NewAdvisory>,
) -> Result<(StatusCode, Json<Advisory>), ApiError> {
    let advisory = state.advisory.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(advisory)))
}

pub async fn get_advisory(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Advisory>, ApiError> {
    Ok(Json(state.advisory.view(id).await?))
}

pub async fn update_advisory(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<AdvisoryUpdate>,
) -> Result<Json<Advisory>, ApiError> {
    Ok(Json(state.advisory.update(&user, id, update).await?))
}

pub async fn delete_advisory(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.advisory.delete(&user, id).await?;
    Ok(Json(MessageResponse::bare("Advisory deleted")))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<LikesResponse>, ApiError> {
    let likes = state.advisory.toggle_like(&user, id).await?;
    Ok(Json(LikesResponse { likes }))
}
