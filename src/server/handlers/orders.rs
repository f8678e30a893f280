use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::models::{DataResponse, NewOrder, Order, OrderStatusUpdate};
use crate::server::{
    config::AppState,
    error::ApiError,
    extract::{ApiJson, ApiPath, AuthUser},
};

pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(input): ApiJson<NewOrder>,
) -> Result<(StatusCode, Json<DataResponse<Order>>), ApiError> {
    let order = state.orders.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(order))))
}

pub async fn buyer_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<DataResponse<Vec<Order>>>, ApiError> {
    let orders = state.orders.for_buyer(&user).await?;
    Ok(Json(DataResponse::new(orders)))
}

pub async fn farmer_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<DataResponse<Vec<Order>>>, ApiError> {
    let orders = state.orders.for_farmer(&user).await?;
    Ok(Json(DataResponse::new(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DataResponse<Order>>, ApiError> {
    let order = state.orders.get(&user, id).await?;
    Ok(Json(DataResponse::new(order)))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<OrderStatusUpdate>,
) -> Result<Json<DataResponse<Order>>, ApiError> {
    let order = state.orders.update_status(&user, id, update.status).await?;
    Ok(Json(DataResponse::new(order)))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DataResponse<Order>>, ApiError> {
    let order = state.orders.cancel(&user, id).await?;
    Ok(Json(DataResponse::new(order)))
}
