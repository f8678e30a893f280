pub mod advisory;
pub mod auth;
pub mod health;
pub mod logistics;
pub mod orders;
pub mod posts;
pub mod products;
