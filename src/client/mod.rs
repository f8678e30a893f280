//! Client library: API access, session handling, the catalog filter store and
//! the transport booking flow.

pub mod api;
pub mod booking;
pub mod catalog;
pub mod error;
pub mod logistics;
pub mod session;
pub mod storage;

pub use api::{ApiClient, ApiConfig, UnauthorizedHandler, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use booking::{ActiveBooking, BookingError, BookingPhase, BookingState};
pub use catalog::{CatalogAction, CatalogState, CatalogStore, FilterState, PriceRange, SellerType};
pub use error::ClientError;
pub use logistics::{book_transport, Transport};
pub use session::{SessionManager, SessionSnapshot, AUTH_TOKEN_KEY, USER_DATA_KEY};
pub use storage::{FileStorage, MemoryStorage, SecureStorage};
