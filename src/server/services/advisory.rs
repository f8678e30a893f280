use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::documents::{Collection, Document, Filter};
use crate::models::post::toggle_like;
use crate::models::{
    Advisory, AdvisoryQuery, AdvisoryUpdate, NewAdvisory, Page, PageRequest, User,
};
use crate::server::error::ApiError;

impl Document for Advisory {
    const COLLECTION: &'static str = "advisories";

    fn id(&self) -> Uuid {
        self.id
    }
}

pub struct AdvisoryService {
    advisories: Collection<Advisory>,
}

impl AdvisoryService {
    pub fn new(advisories: Collection<Advisory>) -> Self {
        Self { advisories }
    }

    pub async fn list(&self, query: &AdvisoryQuery) -> Result<Page<Advisory>, ApiError> {
        let mut filter = Filter::new();
        if let Some(category) = query.category {
            filter = filter.eq("$.category", category.as_str());
        }
        if let Some(season) = query.season {
            filter = filter.eq("$.season", season.as_str());
        }
        if let Some(crop) = query.crop.as_deref().filter(|c| !c.is_empty()) {
            filter = filter.contains("$.targetCrops", crop);
        }
        let page = PageRequest::new(query.page, query.limit);
        Ok(self.advisories.find_page(&filter, page).await?)
    }

    pub async fn create(&self, author: &User, input: NewAdvisory) -> Result<Advisory, ApiError> {
        if input.title.trim().is_empty() || input.content.trim().is_empty() {
            return Err(ApiError::validation("Title and content are required"));
        }
        let now = Utc::now();
        let advisory = Advisory {
            id: Uuid::new_v4(),
            title: input.title,
            content: input.content,
            category: input.category,
            author: author.id,
            attachments: input.attachments,
            tags: input.tags,
            target_crops: input.target_crops,
            season: input.season,
            views: 0,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.advisories.insert(&advisory).await?;
        info!("Advisory {} published by {}", advisory.id, author.id);
        Ok(advisory)
    }

    /// Each read counts as a view.
    pub async fn view(&self, id: Uuid) -> Result<Advisory, ApiError> {
        let mut advisory = self.find(id).await?;
        advisory.views += 1;
        self.advisories.replace(&advisory).await?;
        Ok(advisory)
    }

    pub async fn update(
        &self,
        caller: &User,
        id: Uuid,
        update: AdvisoryUpdate,
    ) -> Result<Advisory, ApiError> {
        let mut advisory = self.find(id).await?;
        if !caller.owns(advisory.author) {
            return Err(ApiError::forbidden("Not authorized"));
        }

        if let Some(title) = update.title.filter(|t| !t.trim().is_empty()) {
            advisory.title = title;
        }
        if let Some(content) = update.content.filter(|c| !c.trim().is_empty()) {
            advisory.content = content;
        }
        if let Some(category) = update.category {
            advisory.category = category;
        }
        if let Some(attachments) = update.attachments {
            advisory.attachments = attachments;
        }
        if let Some(tags) = update.tags {
            advisory.tags = tags;
        }
        if let Some(crops) = update.target_crops {
            advisory.target_crops = crops;
        }
        if let Some(season) = update.season {
            advisory.season = Some(season);
        }
        advisory.updated_at = Utc::now();
        self.advisories.replace(&advisory).await?;
        Ok(advisory)
    }

    pub async fn delete(&self, caller: &User, id: Uuid) -> Result<(), ApiError> {
        let advisory = self.find(id).await?;
        if !caller.owns(advisory.author) {
            return Err(ApiError::forbidden("Not authorized"));
        }
        self.advisories.delete(id).await?;
        Ok(())
    }

    pub async fn toggle_like(&self, caller: &User, id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        let mut advisory = self.find(id).await?;
        toggle_like(&mut advisory.likes, caller.id);
        self.advisories.replace(&advisory).await?;
        Ok(advisory.likes)
    }

    async fn find(&self, id: Uuid) -> Result<Advisory, ApiError> {
        self.advisories
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Advisory not found"))
    }
}
