use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::documents::{Collection, Document, Filter};
use crate::models::post::toggle_like;
use crate::models::{Comment, NewPost, Page, PageRequest, Post, PostQuery, PostUpdate, User};
use crate::server::error::ApiError;

impl Document for Post {
    const COLLECTION: &'static str = "posts";

    fn id(&self) -> Uuid {
        self.id
    }
}

pub struct PostService {
    posts: Collection<Post>,
}

impl PostService {
    pub fn new(posts: Collection<Post>) -> Self {
        Self { posts }
    }

    pub async fn list(&self, query: &PostQuery) -> Result<Page<Post>, ApiError> {
        let mut filter = Filter::new();
        if let Some(category) = query.category {
            filter = filter.eq("$.category", category.as_str());
        }
        if let Some(tag) = query.tag.as_deref().filter(|t| !t.is_empty()) {
            filter = filter.contains("$.tags", tag);
        }
        let page = PageRequest::new(query.page, query.limit);
        Ok(self.posts.find_page(&filter, page).await?)
    }

    pub async fn create(&self, author: &User, input: NewPost) -> Result<Post, ApiError> {
        if input.content.trim().is_empty() {
            return Err(ApiError::validation("Post content is required"));
        }
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            author: author.id,
            content: input.content,
            images: input.images,
            likes: Vec::new(),
            comments: Vec::new(),
            tags: input.tags,
            category: input.category,
            created_at: now,
            updated_at: now,
        };
        self.posts.insert(&post).await?;
        info!("Post {} created by {}", post.id, author.id);
        Ok(post)
    }

    pub async fn get(&self, id: Uuid) -> Result<Post, ApiError> {
        self.posts
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Post not found"))
    }

    pub async fn update(&self, caller: &User, id: Uuid, update: PostUpdate) -> Result<Post, ApiError> {
        let mut post = self.get(id).await?;
        if !caller.owns(post.author) {
            return Err(ApiError::forbidden("Not authorized"));
        }

        if let Some(content) = update.content.filter(|c| !c.trim().is_empty()) {
            post.content = content;
        }
        if let Some(images) = update.images {
            post.images = images;
        }
        if let Some(tags) = update.tags {
            post.tags = tags;
        }
        if let Some(category) = update.category {
            post.category = category;
        }
        post.updated_at = Utc::now();
        self.posts.replace(&post).await?;
        Ok(post)
    }

    pub async fn delete(&self, caller: &User, id: Uuid) -> Result<(), ApiError> {
        let post = self.get(id).await?;
        if !caller.owns(post.author) {
            return Err(ApiError::forbidden("Not authorized"));
        }
        self.posts.delete(id).await?;
        Ok(())
    }

    pub async fn toggle_like(&self, caller: &User, id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        let mut post = self.get(id).await?;
        toggle_like(&mut post.likes, caller.id);
        self.posts.replace(&post).await?;
        Ok(post.likes)
    }

    pub async fn add_comment(
        &self,
        caller: &User,
        id: Uuid,
        content: String,
    ) -> Result<Vec<Comment>, ApiError> {
        if content.trim().is_empty() {
            return Err(ApiError::validation("Comment content is required"));
        }
        let mut post = self.get(id).await?;
        post.comments.push(Comment {
            user: caller.id,
            content,
            created_at: Utc::now(),
        });
        self.posts.replace(&post).await?;
        Ok(post.comments)
    }
}
