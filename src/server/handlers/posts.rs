use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::models::{
    Comment, LikesResponse, MessageResponse, NewComment, NewPost, Post, PostList, PostQuery,
    PostUpdate,
};
use crate::server::{
    config::AppState,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery, AuthUser},
};

// Reads are behind auth like the rest of the community feed.
pub async fn list_posts(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> Result<Json<PostList>, ApiError> {
    let page = state.posts.list(&query).await?;
    Ok(Json(page.into()))
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(input): ApiJson<NewPost>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let post = state.posts.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.posts.get(id).await?))
}

pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<PostUpdate>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.posts.update(&user, id, update).await?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.posts.delete(&user, id).await?;
    Ok(Json(MessageResponse::bare("Post deleted")))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<LikesResponse>, ApiError> {
    let likes = state.posts.toggle_like(&user, id).await?;
    Ok(Json(LikesResponse { likes }))
}

pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(comment): ApiJson<NewComment>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.posts.add_comment(&user, id, comment.content).await?))
}
