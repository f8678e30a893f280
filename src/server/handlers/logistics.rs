use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::models::{
    LogisticsList, LogisticsQuery, LogisticsRequest, LogisticsUpdate, MessageResponse,
    NewLogisticsRequest, StatusUpdate,
};
use crate::server::{
    config::AppState,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery, AuthUser},
};

pub async fn list_requests(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<LogisticsQuery>,
) -> Result<Json<LogisticsList>, ApiError> {
    let page = state.logistics.list(&user, &query).await?;
    Ok(Json(page.into()))
}

pub async fn create_request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(input): ApiJson<NewLogisticsRequest>,
) -> Result<(StatusCode, Json<LogisticsRequest>), ApiError> {
    let request = state.logistics.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn get_request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<LogisticsRequest>, ApiError> {
    Ok(Json(state.logistics.get(&user, id).await?))
}

pub async fn update_request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<LogisticsUpdate>,
) -> Result<Json<LogisticsRequest>, ApiError> {
    Ok(Json(state.logistics.update(&user, id, update).await?))
}

pub async fn delete_request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.logistics.delete(&user, id).await?;
    Ok(Json(MessageResponse::bare("Logistics request deleted")))
}

pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<LogisticsRequest>, ApiError> {
    Ok(Json(state.logistics.update_status(&user, id, update).await?))
}
