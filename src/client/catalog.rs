//! Marketplace catalog held on the client, with the browse filters applied
//! through a pure reducer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ALL_CATEGORIES: &str = "all";
pub const DEFAULT_MIN_PRICE: f64 = 0.0;
pub const DEFAULT_MAX_PRICE: f64 = 20_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub name: String,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    /// Free text, e.g. "50kg" or "1 head".
    pub quantity: String,
    pub location: String,
    pub category: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub seller: Seller,
}

/// A listing before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub quantity: String,
    pub location: String,
    pub category: String,
    pub image: String,
    #[serde(default)]
    pub description: Option<String>,
    pub seller: Seller,
}

impl NewProduct {
    fn with_id(self, id: String) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            quantity: self.quantity,
            location: self.location,
            category: self.category,
            image: self.image,
            description: self.description,
            seller: self.seller,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellerType {
    #[default]
    All,
    Verified,
    Unverified,
}

impl SellerType {
    fn accepts(self, seller: &Seller) -> bool {
        match self {
            SellerType::All => true,
            SellerType::Verified => seller.verified,
            SellerType::Unverified => !seller.verified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both bounds inclusive.
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PRICE, DEFAULT_MAX_PRICE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub category: String,
    pub search_query: String,
    pub price_range: PriceRange,
    /// Empty matches any location.
    pub location: String,
    pub seller_type: SellerType,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: ALL_CATEGORIES.to_string(),
            search_query: String::new(),
            price_range: PriceRange::default(),
            location: String::new(),
            seller_type: SellerType::All,
        }
    }
}

impl FilterState {
    pub fn matches(&self, product: &Product) -> bool {
        if self.category != ALL_CATEGORIES && product.category.to_lowercase() != self.category {
            return false;
        }

        if !self.search_query.is_empty() {
            let query = self.search_query.to_lowercase();
            let hit = product.name.to_lowercase().contains(&query)
                || product.location.to_lowercase().contains(&query)
                || product.seller.name.to_lowercase().contains(&query);
            if !hit {
                return false;
            }
        }

        if !self.price_range.contains(product.price) {
            return false;
        }

        if !self.location.is_empty() && product.location != self.location {
            return false;
        }

        self.seller_type.accepts(&product.seller)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogState {
    pub products: Vec<Product>,
    pub filters: FilterState,
    pub filtered: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogAction {
    SetCategory(String),
    SetSearchQuery(String),
    SetPriceRange(PriceRange),
    SetLocation(String),
    SetSellerType(SellerType),
    AddProduct(Product),
}

/// Full recompute of the filtered view; keeps source order.
pub fn apply_filters(products: &[Product], filters: &FilterState) -> Vec<Product> {
    products
        .iter()
        .filter(|product| filters.matches(product))
        .cloned()
        .collect()
}

pub fn reduce(mut state: CatalogState, action: CatalogAction) -> CatalogState {
    match action {
        CatalogAction::SetCategory(category) => {
            state.filters.category = category.trim().to_lowercase();
        }
        CatalogAction::SetSearchQuery(query) => state.filters.search_query = query,
        CatalogAction::SetPriceRange(range) => state.filters.price_range = range,
        CatalogAction::SetLocation(location) => state.filters.location = location,
        CatalogAction::SetSellerType(seller_type) => state.filters.seller_type = seller_type,
        CatalogAction::AddProduct(product) => state.products.push(product),
    }
    state.filtered = apply_filters(&state.products, &state.filters);
    state
}

impl CatalogState {
    pub fn new(products: Vec<Product>) -> Self {
        let filters = FilterState::default();
        let filtered = apply_filters(&products, &filters);
        Self {
            products,
            filters,
            filtered,
        }
    }

    /// The five listings the marketplace ships with.
    pub fn with_demo_products() -> Self {
        Self::new(demo_products())
    }
}

#[allow(clippy::too_many_arguments)]
fn demo(
    id: &str,
    name: &str,
    price: f64,
    quantity: &str,
    location: &str,
    category: &str,
    image: &str,
    seller: &str,
) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        price,
        quantity: quantity.to_string(),
        location: location.to_string(),
        category: category.to_string(),
        image: image.to_string(),
        description: None,
        seller: Seller {
            name: seller.to_string(),
            verified: true,
        },
    }
}

pub fn demo_products() -> Vec<Product> {
    vec![
        demo(
            "1",
            "Fresh Maize",
            150.0,
            "50kg",
            "Harare",
            "crops",
            "https://images.unsplash.com/photo-1551754655-cd27e38d2076?q=80&w=600",
            "John Moyo",
        ),
        demo(
            "2",
            "Organic Tomatoes",
            80.0,
            "20kg",
            "Bulawayo",
            "crops",
            "https://images.unsplash.com/photo-1592924357228-91a4daadcfea?q=80&w=600",
            "Sarah Ndlovu",
        ),
        demo(
            "3",
            "Merino Sheep",
            450.0,
            "1 head",
            "Gweru",
            "livestock",
            "https://images.unsplash.com/photo-1484557985045-edf25e08da73?q=80&w=600",
            "David Mutasa",
        ),
        demo(
            "4",
            "Tractor (2020)",
            15_000.0,
            "1 unit",
            "Harare",
            "equipment",
            "https://images.unsplash.com/photo-1530267981375-f09de85bf23c?q=80&w=600",
            "Farm Solutions Ltd",
        ),
        demo(
            "5",
            "Hybrid Maize Seeds",
            45.0,
            "5kg",
            "Mutare",
            "seeds",
            "https://images.unsplash.com/photo-1615811361523-6bd03d7748e7?q=80&w=600",
            "Seed Co",
        ),
    ]
}

/// Single owner of a [`CatalogState`]; every setter goes through [`reduce`].
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    state: CatalogState,
}

impl CatalogStore {
    pub fn new(state: CatalogState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn products(&self) -> &[Product] {
        &self.state.products
    }

    pub fn filtered(&self) -> &[Product] {
        &self.state.filtered
    }

    pub fn filters(&self) -> &FilterState {
        &self.state.filters
    }

    pub fn dispatch(&mut self, action: CatalogAction) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.dispatch(CatalogAction::SetCategory(category.into()));
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.dispatch(CatalogAction::SetSearchQuery(query.into()));
    }

    pub fn set_price_range(&mut self, range: PriceRange) {
        self.dispatch(CatalogAction::SetPriceRange(range));
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.dispatch(CatalogAction::SetLocation(location.into()));
    }

    pub fn set_seller_type(&mut self, seller_type: SellerType) {
        self.dispatch(CatalogAction::SetSellerType(seller_type));
    }

    /// Returns the id assigned to the new listing.
    pub fn add_product(&mut self, product: NewProduct) -> String {
        let id = Uuid::new_v4().to_string();
        self.dispatch(CatalogAction::AddProduct(product.with_id(id.clone())));
        id
    }
}
