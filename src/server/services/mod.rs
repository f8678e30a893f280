pub mod advisory;
pub mod auth;
pub mod documents;
pub mod logistics;
pub mod orders;
pub mod posts;
pub mod products;

pub use advisory::AdvisoryService;
pub use auth::AuthService;
pub use documents::{Collection, Document, Filter, StoreError};
pub use logistics::LogisticsService;
pub use orders::OrderService;
pub use posts::PostService;
pub use products::ProductService;
