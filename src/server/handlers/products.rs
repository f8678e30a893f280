use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::models::{
    DataResponse, MessageResponse, NewProduct, Product, ProductList, ProductQuery, ProductUpdate,
};
use crate::server::{
    config::AppState,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery, AuthUser},
};

pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<ProductList>, ApiError> {
    let page = state.products.list(&query).await?;
    Ok(Json(page.into()))
}

pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(input): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<DataResponse<Product>>), ApiError> {
    let product = state.products.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(product))))
}

pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DataResponse<Product>>, ApiError> {
    let product = state.products.get(id).await?;
    Ok(Json(DataResponse::new(product)))
}

pub async fn farmer_products(
    State(state): State<AppState>,
    ApiPath(farmer_id): ApiPath<Uuid>,
) -> Result<Json<DataResponse<Vec<Product>>>, ApiError> {
    let products = state.products.by_farmer(farmer_id).await?;
    Ok(Json(DataResponse::new(products)))
}

pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> Result<Json<DataResponse<Product>>, ApiError> {
    let product = state.products.update(&user, id, update).await?;
    Ok(Json(DataResponse::new(product)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.products.delete(&user, id).await?;
    Ok(Json(MessageResponse::ok("Product deleted successfully")))
}
