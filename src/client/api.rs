//! HTTP client for the FarmLink REST API.
//!
//! One [`ApiClient`] is built up front and handed to whoever needs it. Clones
//! share the bearer token, so setting it through the session manager is seen
//! by every clone.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::error::{ClientError, Result};
use crate::models::{
    Advisory, AdvisoryList, AdvisoryQuery, AdvisoryUpdate, AuthResponse, Comment, DataResponse,
    LikesResponse, LoginRequest, LogisticsList, LogisticsQuery, LogisticsRequest, LogisticsUpdate,
    MessageResponse, NewAdvisory, NewComment, NewLogisticsRequest, NewOrder, NewPost, NewProduct,
    Order, OrderStatus, OrderStatusUpdate, Post, PostList, PostQuery, PostUpdate, Product,
    ProductList, ProductQuery, ProductUpdate, ProfileUpdate, RegisterRequest, StatusUpdate,
    UserResponse,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

const FALLBACK_ERROR: &str = "Network response was not ok";

/// A 401 from these means wrong credentials, not a dead session.
const CREDENTIAL_PATHS: [&str; 2] = ["auth/login", "auth/register"];

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix.
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Told when an authenticated request comes back 401, after the client has
/// already dropped its token.
#[async_trait]
pub trait UnauthorizedHandler: Send + Sync {
    async fn on_unauthorized(&self);
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    token: Arc<RwLock<Option<String>>>,
    unauthorized: Arc<Mutex<Option<Weak<dyn UnauthorizedHandler>>>>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let parsed =
            Url::parse(&config.base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            token: Arc::new(RwLock::new(config.token)),
            unauthorized: Arc::new(Mutex::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Held weakly so a handler that owns this client does not keep itself alive.
    pub fn set_unauthorized_handler(&self, handler: Weak<dyn UnauthorizedHandler>) {
        *self
            .unauthorized
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    pub fn with_unauthorized_handler(self, handler: Weak<dyn UnauthorizedHandler>) -> Self {
        self.set_unauthorized_handler(handler);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn builder(&self, method: Method, path: &str) -> (RequestBuilder, bool) {
        let url = self.url(path);
        debug!("{} {}", method, url);
        let mut builder = self.http.request(method, url);
        let token = self.token.read().await.clone();
        let authenticated =
            token.is_some() && !CREDENTIAL_PATHS.contains(&path.trim_start_matches('/'));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        (builder, authenticated)
    }

    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (builder, authenticated) = self.builder(Method::GET, path).await;
        self.execute(builder, authenticated).await
    }

    #[instrument(skip(self, query), fields(path = %path))]
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T> {
        let (builder, authenticated) = self.builder(Method::GET, path).await;
        self.execute(builder.query(query), authenticated).await
    }

    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let (builder, authenticated) = self.builder(Method::POST, path).await;
        self.execute(builder.json(body), authenticated).await
    }

    #[instrument(skip(self), fields(path = %path))]
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (builder, authenticated) = self.builder(Method::POST, path).await;
        self.execute(builder, authenticated).await
    }

    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let (builder, authenticated) = self.builder(Method::PUT, path).await;
        self.execute(builder.json(body), authenticated).await
    }

    #[instrument(skip(self), fields(path = %path))]
    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (builder, authenticated) = self.builder(Method::PUT, path).await;
        self.execute(builder, authenticated).await
    }

    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let (builder, authenticated) = self.builder(Method::PATCH, path).await;
        self.execute(builder.json(body), authenticated).await
    }

    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (builder, authenticated) = self.builder(Method::DELETE, path).await;
        self.execute(builder, authenticated).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        authenticated: bool,
    ) -> Result<T> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::InvalidResponse(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let message = error_message(&text);

        if status.as_u16() == 401 {
            if authenticated {
                warn!("Authenticated request rejected with 401, clearing session");
                self.evict().await;
            }
            return Err(ClientError::Unauthorized { message });
        }

        warn!("API error ({}): {}", status.as_u16(), message);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn evict(&self) {
        self.set_token(None).await;
        let handler = self
            .unauthorized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade);
        if let Some(handler) = handler {
            handler.on_unauthorized().await;
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else {
            ClientError::Network(err.to_string())
        }
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    pub fn products(&self) -> ProductsApi<'_> {
        ProductsApi { client: self }
    }

    pub fn orders(&self) -> OrdersApi<'_> {
        OrdersApi { client: self }
    }

    pub fn logistics(&self) -> LogisticsApi<'_> {
        LogisticsApi { client: self }
    }

    pub fn posts(&self) -> PostsApi<'_> {
        PostsApi { client: self }
    }

    pub fn advisory(&self) -> AdvisoryApi<'_> {
        AdvisoryApi { client: self }
    }
}

fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.or(parsed.error) {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        FALLBACK_ERROR.to_string()
    } else {
        trimmed.to_string()
    }
}

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl AuthApi<'_> {
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse> {
        self.client.post("/auth/login", credentials).await
    }

    pub async fn register(&self, details: &RegisterRequest) -> Result<AuthResponse> {
        self.client.post("/auth/register", details).await
    }

    pub async fn me(&self) -> Result<UserResponse> {
        self.client.get("/auth/me").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserResponse> {
        self.client.put("/auth/profile", update).await
    }
}

pub struct ProductsApi<'a> {
    client: &'a ApiClient,
}

impl ProductsApi<'_> {
    pub async fn list(&self, query: &ProductQuery) -> Result<ProductList> {
        self.client.get_with_query("/products", query).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Product> {
        let response: DataResponse<Product> = self.client.get(&format!("/products/{id}")).await?;
        Ok(response.data)
    }

    pub async fn by_farmer(&self, farmer: Uuid) -> Result<Vec<Product>> {
        let response: DataResponse<Vec<Product>> =
            self.client.get(&format!("/products/farmer/{farmer}")).await?;
        Ok(response.data)
    }

    pub async fn create(&self, product: &NewProduct) -> Result<Product> {
        let response: DataResponse<Product> = self.client.post("/products", product).await?;
        Ok(response.data)
    }

    pub async fn update(&self, id: Uuid, update: &ProductUpdate) -> Result<Product> {
        let response: DataResponse<Product> =
            self.client.put(&format!("/products/{id}"), update).await?;
        Ok(response.data)
    }

    pub async fn delete(&self, id: Uuid) -> Result<MessageResponse> {
        self.client.delete(&format!("/products/{id}")).await
    }
}

pub struct OrdersApi<'a> {
    client: &'a ApiClient,
}

impl OrdersApi<'_> {
    pub async fn create(&self, order: &NewOrder) -> Result<Order> {
        let response: DataResponse<Order> = self.client.post("/orders", order).await?;
        Ok(response.data)
    }

    pub async fn buyer(&self) -> Result<Vec<Order>> {
        let response: DataResponse<Vec<Order>> = self.client.get("/orders/buyer").await?;
        Ok(response.data)
    }

    pub async fn farmer(&self) -> Result<Vec<Order>> {
        let response: DataResponse<Vec<Order>> = self.client.get("/orders/farmer").await?;
        Ok(response.data)
    }

    pub async fn get(&self, id: Uuid) -> Result<Order> {
        let response: DataResponse<Order> = self.client.get(&format!("/orders/{id}")).await?;
        Ok(response.data)
    }

    pub async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order> {
        let response: DataResponse<Order> = self
            .client
            .put(&format!("/orders/{id}/status"), &OrderStatusUpdate { status })
            .await?;
        Ok(response.data)
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Order> {
        let response: DataResponse<Order> =
            self.client.put_empty(&format!("/orders/{id}/cancel")).await?;
        Ok(response.data)
    }
}

pub struct LogisticsApi<'a> {
    client: &'a ApiClient,
}

impl LogisticsApi<'_> {
    pub async fn list(&self, query: &LogisticsQuery) -> Result<LogisticsList> {
        self.client.get_with_query("/logistics", query).await
    }

    pub async fn create(&self, request: &NewLogisticsRequest) -> Result<LogisticsRequest> {
        self.client.post("/logistics", request).await
    }

    pub async fn get(&self, id: Uuid) -> Result<LogisticsRequest> {
        self.client.get(&format!("/logistics/{id}")).await
    }

    pub async fn update(&self, id: Uuid, update: &LogisticsUpdate) -> Result<LogisticsRequest> {
        self.client.put(&format!("/logistics/{id}"), update).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<MessageResponse> {
        self.client.delete(&format!("/logistics/{id}")).await
    }

    pub async fn update_status(&self, id: Uuid, update: &StatusUpdate) -> Result<LogisticsRequest> {
        self.client
            .patch(&format!("/logistics/{id}/status"), update)
            .await
    }
}

pub struct PostsApi<'a> {
    client: &'a ApiClient,
}

impl PostsApi<'_> {
    pub async fn list(&self, query: &PostQuery) -> Result<PostList> {
        self.client.get_with_query("/posts", query).await
    }

    pub async fn create(&self, post: &NewPost) -> Result<Post> {
        self.client.post("/posts", post).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Post> {
        self.client.get(&format!("/posts/{id}")).await
    }

    pub async fn update(&self, id: Uuid, update: &PostUpdate) -> Result<Post> {
        self.client.put(&format!("/posts/{id}"), update).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<MessageResponse> {
        self.client.delete(&format!("/posts/{id}")).await
    }

    pub async fn toggle_like(&self, id: Uuid) -> Result<Vec<Uuid>> {
        let response: LikesResponse = self.client.post_empty(&format!("/posts/{id}/like")).await?;
        Ok(response.likes)
    }

    pub async fn comment(&self, id: Uuid, content: impl Into<String>) -> Result<Vec<Comment>> {
        let body = NewComment {
            content: content.into(),
        };
        self.client
            .post(&format!("/posts/{id}/comments"), &body)
            .await
    }
}

pub struct AdvisoryApi<'a> {
    client: &'a ApiClient,
}

impl AdvisoryApi<'_> {
    pub async fn list(&self, query: &AdvisoryQuery) -> Result<AdvisoryList> {
        self.client.get_with_query("/advisory", query).await
    }

    pub async fn create(&self, advisory: &NewAdvisory) -> Result<Advisory> {
        self.client.post("/advisory", advisory).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Advisory> {
        self.client.get(&format!("/advisory/{id}")).await
    }

    pub async fn update(&self, id: Uuid, update: &AdvisoryUpdate) -> Result<Advisory> {
        self.client.put(&format!("/advisory/{id}"), update).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<MessageResponse> {
        self.client.delete(&format!("/advisory/{id}")).await
    }

    pub async fn toggle_like(&self, id: Uuid) -> Result<Vec<Uuid>> {
        let response: LikesResponse =
            self.client.post_empty(&format!("/advisory/{id}/like")).await?;
        Ok(response.likes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_base_urls() {
        assert!(matches!(
            ApiClient::new(ApiConfig::new("not a url")),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            ApiClient::new(ApiConfig::new("ftp://farm.test/api")),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn joins_paths_under_the_api_prefix() {
        let client = ApiClient::new(ApiConfig::new("http://farm.test/api/")).unwrap();
        assert_eq!(client.url("/auth/me"), "http://farm.test/api/auth/me");
        assert_eq!(client.url("products"), "http://farm.test/api/products");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn error_message_prefers_server_message() {
        assert_eq!(
            error_message(r#"{"success":false,"message":"Not authorized"}"#),
            "Not authorized"
        );
        assert_eq!(error_message(r#"{"error":"boom"}"#), "boom");
        assert_eq!(error_message("bad gateway"), "bad gateway");
        assert_eq!(error_message(""), FALLBACK_ERROR);
    }
}
