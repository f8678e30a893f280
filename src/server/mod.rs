pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod services;

pub use config::{app_router, configure_app, AppState};
pub use error::ApiError;
