//! Client-side session: bearer token plus cached user profile, mirrored to
//! [`SecureStorage`] under `authToken` and `userData`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::api::{ApiClient, UnauthorizedHandler};
use super::error::{ClientError, Result};
use super::storage::SecureStorage;
use crate::models::{AuthResponse, LoginRequest, ProfileUpdate, RegisterRequest, User};

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_DATA_KEY: &str = "userData";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

struct SessionInner {
    api: ApiClient,
    storage: Arc<dyn SecureStorage>,
    token: RwLock<Option<String>>,
    user: RwLock<Option<User>>,
}

impl SessionInner {
    async fn clear(&self) {
        *self.token.write().await = None;
        *self.user.write().await = None;
        self.api.set_token(None).await;

        for key in [AUTH_TOKEN_KEY, USER_DATA_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                error!("Failed to remove {} from storage: {}", key, e);
            }
        }
    }

    async fn store_user(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.storage.set(USER_DATA_KEY, &raw).await?;
        *self.user.write().await = Some(user.clone());
        Ok(())
    }
}

#[async_trait]
impl UnauthorizedHandler for SessionInner {
    async fn on_unauthorized(&self) {
        warn!("Session rejected by server, logging out");
        self.clear().await;
    }
}

/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    /// Registers itself as the client's 401 handler.
    pub fn new(api: ApiClient, storage: Arc<dyn SecureStorage>) -> Self {
        let inner = Arc::new(SessionInner {
            api,
            storage,
            token: RwLock::new(None),
            user: RwLock::new(None),
        });
        let handler = Arc::downgrade(&inner);
        inner.api.set_unauthorized_handler(handler);
        Self { inner }
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub async fn login(&self, credentials: LoginRequest) -> Result<User> {
        let response = self.inner.api.auth().login(&credentials).await?;
        info!("Logged in as {}", response.user.email);
        self.establish(response).await
    }

    pub async fn register(&self, details: RegisterRequest) -> Result<User> {
        let response = self.inner.api.auth().register(&details).await?;
        info!("Registered {}", response.user.email);
        self.establish(response).await
    }

    /// Never fails; storage errors are logged.
    pub async fn logout(&self) {
        self.inner.clear().await;
        info!("Logged out");
    }

    /// Restores a persisted session and re-validates it against `/auth/me`.
    /// Any validation failure ends in a full logout and `Ok(None)`.
    pub async fn load_stored_auth(&self) -> Result<Option<User>> {
        let Some(token) = self.inner.storage.get(AUTH_TOKEN_KEY).await? else {
            return Ok(None);
        };

        let cached = match self.inner.storage.get(USER_DATA_KEY).await? {
            Some(raw) => serde_json::from_str::<User>(&raw)
                .map_err(|e| warn!("Discarding unreadable cached user: {}", e))
                .ok(),
            None => None,
        };

        *self.inner.token.write().await = Some(token.clone());
        *self.inner.user.write().await = cached;
        self.inner.api.set_token(Some(token)).await;

        match self.inner.api.auth().me().await {
            Ok(response) => {
                self.inner.store_user(&response.user).await?;
                Ok(Some(response.user))
            }
            Err(e) => {
                warn!("Stored session is no longer valid: {}", e);
                self.logout().await;
                Ok(None)
            }
        }
    }

    pub async fn refresh_user(&self) -> Result<User> {
        self.require_token().await?;
        let response = self.inner.api.auth().me().await?;
        self.inner.store_user(&response.user).await?;
        Ok(response.user)
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User> {
        self.require_token().await?;
        let response = self.inner.api.auth().update_profile(&update).await?;
        self.inner.store_user(&response.user).await?;
        Ok(response.user)
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.token.read().await.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.inner.user.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token().await,
            user: self.user().await,
        }
    }

    async fn establish(&self, response: AuthResponse) -> Result<User> {
        self.inner
            .storage
            .set(AUTH_TOKEN_KEY, &response.token)
            .await?;
        self.inner.store_user(&response.user).await?;
        *self.inner.token.write().await = Some(response.token.clone());
        self.inner.api.set_token(Some(response.token)).await;
        Ok(response.user)
    }

    async fn require_token(&self) -> Result<()> {
        if self.is_authenticated().await {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }
}
