//! Wire types shared by the HTTP server and the client library.

pub mod advisory;
pub mod logistics;
pub mod order;
pub mod pagination;
pub mod post;
pub mod product;
pub mod responses;
pub mod user;

pub use advisory::{Advisory, AdvisoryCategory, AdvisoryQuery, AdvisoryUpdate, NewAdvisory, Season};
pub use logistics::{
    Coordinates, LogisticsItem, LogisticsQuery, LogisticsRequest, LogisticsStatus, LogisticsType,
    LogisticsUpdate, NewLogisticsRequest, Place, StatusUpdate, VehicleType,
};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, OrderStatusUpdate};
pub use pagination::{Page, PageMeta, PageRequest};
pub use post::{Comment, NewComment, NewPost, Post, PostCategory, PostQuery, PostUpdate};
pub use product::{
    NewProduct, Product, ProductCategory, ProductLocation, ProductQuery, ProductUpdate, Unit,
};
pub use responses::{
    AdvisoryList, AuthResponse, DataResponse, LikesResponse, LogisticsList, MessageResponse,
    PostList, ProductList, ProductPagination, UserResponse,
};
pub use user::{LoginRequest, ProfileUpdate, RegisterRequest, Role, User};
