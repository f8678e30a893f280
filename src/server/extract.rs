use axum::extract::{FromRequest, FromRequestParts, Path, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use tracing::warn;

use super::config::AppState;
use super::error::ApiError;
use super::services::auth::AuthError;
use crate::models::User;

/// `Json` with rejections reported as `{success:false, message}`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// The caller resolved from `Authorization: Bearer <jwt>`.
pub struct AuthUser(pub User);

pub fn bearer_token(header_value: Option<&str>) -> Result<&str, AuthError> {
    let raw = header_value.ok_or(AuthError::MissingToken)?;
    let Some(token) = raw.trim().strip_prefix("Bearer ") else {
        return Err(AuthError::MissingToken);
    };
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = bearer_token(header)?;

        match state.auth.authenticate(token).await {
            Ok(user) => Ok(AuthUser(user)),
            Err(err) => {
                warn!("Rejected bearer token on {}: {}", parts.uri.path(), err);
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_requires_scheme_and_value() {
        assert!(matches!(bearer_token(None), Err(AuthError::MissingToken)));
        assert!(matches!(
            bearer_token(Some("Basic abc")),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(Some("Bearer   ")),
            Err(AuthError::MissingToken)
        ));
        assert_eq!(bearer_token(Some(" Bearer abc.def ")).unwrap(), "abc.def");
    }
}
