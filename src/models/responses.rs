//! Response envelopes shared by the server handlers and the client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Advisory, LogisticsRequest, Page, PageMeta, Post, Product, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: Some(true),
            message: message.into(),
        }
    }

    pub fn bare(message: impl Into<String>) -> Self {
        Self {
            success: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikesResponse {
    pub likes: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductPagination {
    pub current: u32,
    pub pages: u64,
    pub count: usize,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductList {
    pub success: bool,
    pub data: Vec<Product>,
    pub pagination: ProductPagination,
}

impl From<Page<Product>> for ProductList {
    fn from(page: Page<Product>) -> Self {
        let pagination = ProductPagination {
            current: page.page,
            pages: page.total_pages(),
            count: page.items.len(),
            total: page.total,
        };
        Self {
            success: true,
            data: page.items,
            pagination,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticsList {
    pub requests: Vec<LogisticsRequest>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

impl From<Page<LogisticsRequest>> for LogisticsList {
    fn from(page: Page<LogisticsRequest>) -> Self {
        let meta = page.meta();
        Self {
            requests: page.items,
            meta,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostList {
    pub posts: Vec<Post>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

impl From<Page<Post>> for PostList {
    fn from(page: Page<Post>) -> Self {
        let meta = page.meta();
        Self {
            posts: page.items,
            meta,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryList {
    pub advisories: Vec<Advisory>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

impl From<Page<Advisory>> for AdvisoryList {
    fn from(page: Page<Advisory>) -> Self {
        let meta = page.meta();
        Self {
            advisories: page.items,
            meta,
        }
    }
}
