use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::documents::{Collection, Document, Filter};
use crate::models::{NewOrder, Order, OrderItem, OrderStatus, Product, User};
use crate::server::error::ApiError;

impl Document for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Orders and the stock they reserve. Stock moves only inside a write
/// transaction, and every product write is conditional on the exact document
/// that was read, so a failed order leaves inventory exactly as it was.
pub struct OrderService {
    orders: Collection<Order>,
    products: Collection<Product>,
}

impl OrderService {
    pub fn new(orders: Collection<Order>, products: Collection<Product>) -> Self {
        Self { orders, products }
    }

    pub async fn create(&self, buyer: &User, input: NewOrder) -> Result<Order, ApiError> {
        if input.items.is_empty() {
            return Err(ApiError::validation("Order must contain at least one item"));
        }
        if input
            .items
            .iter()
            .any(|item| item.quantity.is_nan() || item.quantity <= 0.0)
        {
            return Err(ApiError::validation("Item quantity must be greater than zero"));
        }

        let mut tx = self.orders.begin_write().await?;
        let mut items = Vec::with_capacity(input.items.len());

        for requested in &input.items {
            let Some((mut product, revision)) =
                Collection::<Product>::get_with_revision_in(&mut tx, requested.product).await?
            else {
                return Err(ApiError::validation(format!(
                    "Product {} not found",
                    requested.product
                )));
            };
            if !product.is_available || product.quantity < requested.quantity {
                warn!(
                    "Order by {} rejected: {} has {} left, {} requested",
                    buyer.id, product.id, product.quantity, requested.quantity
                );
                return Err(ApiError::validation(format!(
                    "Product {} is not available in requested quantity",
                    product.name
                )));
            }

            product.quantity -= requested.quantity;
            product.updated_at = Utc::now();
            if !Collection::replace_if_in(&mut tx, &product, &revision).await? {
                return Err(ApiError::Conflict(format!(
                    "Stock for {} changed, please retry",
                    product.name
                )));
            }

            items.push(OrderItem {
                product: product.id,
                quantity: requested.quantity,
                price: product.price,
            });
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            buyer: buyer.id,
            total_amount: items.iter().map(|item| item.price * item.quantity).sum(),
            items,
            status: OrderStatus::Pending,
            delivery_address: input.delivery_address,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        Collection::insert_in(&mut tx, &order).await?;
        tx.commit().await?;

        info!("Order {} placed by {} for {}", order.id, buyer.id, order.total_amount);
        Ok(order)
    }

    pub async fn for_buyer(&self, buyer: &User) -> Result<Vec<Order>, ApiError> {
        Ok(self.orders.find(&Filter::new().eq("$.buyer", buyer.id)).await?)
    }

    /// Orders containing at least one of the farmer's products.
    pub async fn for_farmer(&self, farmer: &User) -> Result<Vec<Order>, ApiError> {
        let product_ids = self.farmer_product_ids(farmer.id).await?;
        let filter = Filter::new().any_item_in("$.items", "$.product", product_ids);
        Ok(self.orders.find(&filter).await?)
    }

    pub async fn get(&self, caller: &User, id: Uuid) -> Result<Order, ApiError> {
        let order = self.find(id).await?;
        if caller.owns(order.buyer) {
            return Ok(order);
        }
        let product_ids = self.farmer_product_ids(caller.id).await?;
        if !order.contains_any(&product_ids) {
            return Err(ApiError::forbidden("Not authorized to view this order"));
        }
        Ok(order)
    }

    pub async fn update_status(
        &self,
        caller: &User,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let mut order = self.find(id).await?;
        let product_ids = self.farmer_product_ids(caller.id).await?;
        if !order.contains_any(&product_ids) {
            return Err(ApiError::forbidden("Not authorized to update this order"));
        }
        if status == OrderStatus::Cancelled {
            return Err(ApiError::invalid_state(
                "Orders are cancelled through the cancel endpoint",
            ));
        }
        if order.status.is_final() {
            return Err(ApiError::invalid_state(format!(
                "Order is already {}",
                order.status.as_str()
            )));
        }

        order.status = status;
        order.updated_at = Utc::now();
        self.orders.replace(&order).await?;
        info!("Order {} moved to {} by {}", order.id, status.as_str(), caller.id);
        Ok(order)
    }

    /// Buyer-side cancellation; puts the reserved stock back.
    pub async fn cancel(&self, caller: &User, id: Uuid) -> Result<Order, ApiError> {
        let mut tx = self.orders.begin_write().await?;
        let (mut order, order_revision) = Collection::<Order>::get_with_revision_in(&mut tx, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order not found"))?;

        if !order.status.is_cancellable() {
            return Err(ApiError::invalid_state(
                "Order cannot be cancelled at this stage",
            ));
        }
        if !caller.owns(order.buyer) {
            return Err(ApiError::forbidden("Not authorized to cancel this order"));
        }

        for item in &order.items {
            let Some((mut product, revision)) =
                Collection::<Product>::get_with_revision_in(&mut tx, item.product).await?
            else {
                warn!("Order {} references removed product {}", order.id, item.product);
                continue;
            };
            product.quantity += item.quantity;
            product.updated_at = Utc::now();
            if !Collection::replace_if_in(&mut tx, &product, &revision).await? {
                return Err(ApiError::Conflict(format!(
                    "Stock for {} changed, please retry",
                    product.name
                )));
            }
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        if !Collection::replace_if_in(&mut tx, &order, &order_revision).await? {
            return Err(ApiError::Conflict("Order changed, please retry".into()));
        }
        tx.commit().await?;

        info!("Order {} cancelled by {}", order.id, caller.id);
        Ok(order)
    }

    async fn find(&self, id: Uuid) -> Result<Order, ApiError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order not found"))
    }

    async fn farmer_product_ids(&self, farmer: Uuid) -> Result<Vec<Uuid>, ApiError> {
        let products = self.products.find(&Filter::new().eq("$.farmer", farmer)).await?;
        Ok(products.into_iter().map(|p| p.id).collect())
    }
}
