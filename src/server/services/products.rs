use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::documents::{Collection, Document, Filter};
use crate::models::product::haversine_km;
use crate::models::{NewProduct, Page, PageRequest, Product, ProductQuery, ProductUpdate, User};
use crate::server::error::ApiError;

impl Document for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> Uuid {
        self.id
    }
}

pub struct ProductService {
    products: Collection<Product>,
}

impl ProductService {
    pub fn new(products: Collection<Product>) -> Self {
        Self { products }
    }

    pub fn collection(&self) -> &Collection<Product> {
        &self.products
    }

    pub async fn create(&self, farmer: &User, input: NewProduct) -> Result<Product, ApiError> {
        validate_listing(input.price, input.quantity, &input.images)?;
        if input.name.trim().is_empty() {
            return Err(ApiError::validation("Product name is required"));
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
            unit: input.unit,
            category: input.category,
            images: input.images,
            farmer: farmer.id,
            location: input.location,
            is_available: input.is_available.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        self.products.insert(&product).await?;
        info!("Product {} listed by {}", product.id, farmer.id);
        Ok(product)
    }

    /// Geo queries are filtered and ordered by distance in memory, after the
    /// field filters have run in SQL.
    pub async fn list(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        let page = PageRequest::new(query.page, query.limit);
        let mut filter = Filter::new();
        if let Some(category) = query.category {
            filter = filter.eq("$.category", category.as_str());
        }
        if let Some(min) = query.min_price {
            filter = filter.gte("$.price", min);
        }
        if let Some(max) = query.max_price {
            filter = filter.lte("$.price", max);
        }
        if let Some(available) = query.is_available {
            filter = filter.eq("$.isAvailable", available);
        }

        let Some((lat, lng, max_km)) = query.near() else {
            return Ok(self.products.find_page(&filter, page).await?);
        };

        let mut nearby: Vec<(f64, Product)> = self
            .products
            .find(&filter)
            .await?
            .into_iter()
            .map(|p| (haversine_km(lat, lng, p.location.lat(), p.location.lng()), p))
            .filter(|(distance, _)| *distance <= max_km)
            .collect();
        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = nearby.len() as u64;
        let items = nearby
            .into_iter()
            .map(|(_, p)| p)
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Page {
            items,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, ApiError> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Product not found"))
    }

    pub async fn by_farmer(&self, farmer: Uuid) -> Result<Vec<Product>, ApiError> {
        Ok(self.products.find(&Filter::new().eq("$.farmer", farmer)).await?)
    }

    pub async fn update(
        &self,
        caller: &User,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<Product, ApiError> {
        let mut product = self.get(id).await?;
        if !caller.owns(product.farmer) {
            return Err(ApiError::forbidden("Not authorized to update this product"));
        }

        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(quantity) = update.quantity {
            product.quantity = quantity;
        }
        if let Some(unit) = update.unit {
            product.unit = unit;
        }
        if let Some(category) = update.category {
            product.category = category;
        }
        if let Some(images) = update.images {
            product.images = images;
        }
        if let Some(location) = update.location {
            product.location = location;
        }
        if let Some(available) = update.is_available {
            product.is_available = available;
        }
        validate_listing(product.price, product.quantity, &product.images)?;

        product.updated_at = Utc::now();
        self.products.replace(&product).await?;
        Ok(product)
    }

    pub async fn delete(&self, caller: &User, id: Uuid) -> Result<(), ApiError> {
        let product = self.get(id).await?;
        if !caller.owns(product.farmer) {
            return Err(ApiError::forbidden("Not authorized to delete this product"));
        }
        self.products.delete(id).await?;
        info!("Product {} removed by {}", id, caller.id);
        Ok(())
    }
}

fn validate_listing(price: f64, quantity: f64, images: &[String]) -> Result<(), ApiError> {
    if price.is_nan() || price < 0.0 {
        return Err(ApiError::validation("Price cannot be negative"));
    }
    if quantity.is_nan() || quantity < 0.0 {
        return Err(ApiError::validation("Quantity cannot be negative"));
    }
    if images.is_empty() {
        return Err(ApiError::validation("At least one image is required"));
    }
    Ok(())
}
