use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configuration::AuthSettings;
use crate::server::{
    handlers::{advisory, auth, health, logistics, orders, posts, products},
    services::{
        AdvisoryService, AuthService, Collection, LogisticsService, OrderService, PostService,
        ProductService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub auth: Arc<AuthService>,
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub logistics: Arc<LogisticsService>,
    pub posts: Arc<PostService>,
    pub advisory: Arc<AdvisoryService>,
}

impl AppState {
    pub fn new(pool: SqlitePool, auth_settings: AuthSettings) -> Self {
        let auth = Arc::new(AuthService::new(Collection::new(pool.clone()), auth_settings));
        let products = Arc::new(ProductService::new(Collection::new(pool.clone())));
        let orders = Arc::new(OrderService::new(
            Collection::new(pool.clone()),
            Collection::new(pool.clone()),
        ));
        let logistics = Arc::new(LogisticsService::new(Collection::new(pool.clone())));
        let posts = Arc::new(PostService::new(Collection::new(pool.clone())));
        let advisory = Arc::new(AdvisoryService::new(Collection::new(pool.clone())));

        Self {
            pool,
            auth,
            products,
            orders,
            logistics,
            posts,
            advisory,
        }
    }
}

pub fn configure_app(pool: SqlitePool, auth_settings: AuthSettings) -> Router {
    app_router(AppState::new(pool, auth_settings))
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        // Products
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/products/farmer/:farmer_id", get(products::farmer_products))
        // Orders
        .route("/orders", post(orders::create_order))
        .route("/orders/buyer", get(orders::buyer_orders))
        .route("/orders/farmer", get(orders::farmer_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/status", put(orders::update_order_status))
        .route("/orders/:id/cancel", put(orders::cancel_order))
        // Logistics
        .route(
            "/logistics",
            get(logistics::list_requests).post(logistics::create_request),
        )
        .route(
            "/logistics/:id",
            get(logistics::get_request)
                .put(logistics::update_request)
                .delete(logistics::delete_request),
        )
        .route("/logistics/:id/status", patch(logistics::update_status))
        // Community
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/:id/like", post(posts::toggle_like))
        .route("/posts/:id/comments", post(posts::add_comment))
        // Advisory
        .route(
            "/advisory",
            get(advisory::list_advisories).post(advisory::create_advisory),
        )
        .route(
            "/advisory/:id",
            get(advisory::get_advisory)
                .put(advisory::update_advisory)
                .delete(advisory::delete_advisory),
        )
        .route("/advisory/:id/like", post(advisory::toggle_like))
}
