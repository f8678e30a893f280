//! Logistics requests: creation, requester edits, and the admin-driven
//! status lifecycle.
//!
//! Checks run in a fixed order so callers see consistent failures: missing
//! request (404), then lifecycle precondition (400), then ownership (403).

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::documents::{Collection, Document, Filter};
use crate::models::{
    LogisticsQuery, LogisticsRequest, LogisticsStatus, LogisticsUpdate, NewLogisticsRequest, Page,
    PageRequest, StatusUpdate, User,
};
use crate::server::error::ApiError;

const NOT_AUTHORIZED: &str = "Not authorized";

impl Document for LogisticsRequest {
    const COLLECTION: &'static str = "logistics_requests";

    fn id(&self) -> Uuid {
        self.id
    }
}

pub struct LogisticsService {
    requests: Collection<LogisticsRequest>,
}

impl LogisticsService {
    pub fn new(requests: Collection<LogisticsRequest>) -> Self {
        Self { requests }
    }

    /// Admins see every request; everyone else only their own.
    pub async fn list(
        &self,
        caller: &User,
        query: &LogisticsQuery,
    ) -> Result<Page<LogisticsRequest>, ApiError> {
        let mut filter = Filter::new();
        if let Some(kind) = query.kind {
            filter = filter.eq("$.type", kind.as_str());
        }
        if let Some(status) = query.status {
            filter = filter.eq("$.status", status.as_str());
        }
        if !caller.is_admin {
            filter = filter.eq("$.requester", caller.id);
        }

        let page = PageRequest::new(query.page, query.limit);
        Ok(self.requests.find_page(&filter, page).await?)
    }

    pub async fn create(
        &self,
        caller: &User,
        input: NewLogisticsRequest,
    ) -> Result<LogisticsRequest, ApiError> {
        validate_price(input.price)?;

        let now = Utc::now();
        let request = LogisticsRequest {
            id: Uuid::new_v4(),
            requester: caller.id,
            kind: input.kind,
            status: LogisticsStatus::Pending,
            pickup_location: input.pickup_location,
            delivery_location: input.delivery_location,
            scheduled_date: input.scheduled_date,
            items: input.items,
            vehicle_type: input.vehicle_type,
            special_instructions: input.special_instructions,
            price: input.price,
            assigned_driver: None,
            created_at: now,
            updated_at: now,
        };
        self.requests.insert(&request).await?;
        info!(
            "Logistics request {} ({}, {}) created by {}",
            request.id,
            request.kind.as_str(),
            request.vehicle_type.as_str(),
            caller.id
        );
        Ok(request)
    }

    pub async fn get(&self, caller: &User, id: Uuid) -> Result<LogisticsRequest, ApiError> {
        let request = self.find(id).await?;
        if !caller.can_manage(request.requester) {
            return Err(ApiError::forbidden(NOT_AUTHORIZED));
        }
        Ok(request)
    }

    /// Edits are only possible while the request is pending. The one status
    /// change accepted here is self-cancellation.
    pub async fn update(
        &self,
        caller: &User,
        id: Uuid,
        update: LogisticsUpdate,
    ) -> Result<LogisticsRequest, ApiError> {
        let mut request = self.find(id).await?;
        if request.status != LogisticsStatus::Pending {
            return Err(ApiError::invalid_state(
                "Cannot update request after it has been accepted",
            ));
        }
        if !caller.can_manage(request.requester) {
            return Err(ApiError::forbidden(NOT_AUTHORIZED));
        }
        match update.status {
            None | Some(LogisticsStatus::Pending) | Some(LogisticsStatus::Cancelled) => {}
            Some(other) => {
                warn!(
                    "User {} tried to set logistics request {} to {} via update",
                    caller.id, id, other
                );
                return Err(ApiError::forbidden(
                    "Only an admin can change the status of a request",
                ));
            }
        }

        if let Some(kind) = update.kind {
            request.kind = kind;
        }
        if let Some(place) = update.pickup_location {
            request.pickup_location = Some(place);
        }
        if let Some(place) = update.delivery_location {
            request.delivery_location = Some(place);
        }
        if let Some(date) = update.scheduled_date {
            request.scheduled_date = date;
        }
        if let Some(items) = update.items {
            request.items = items;
        }
        if let Some(vehicle) = update.vehicle_type {
            request.vehicle_type = vehicle;
        }
        if let Some(instructions) = update.special_instructions {
            request.special_instructions = Some(instructions);
        }
        if let Some(price) = update.price {
            validate_price(price)?;
            request.price = price;
        }
        if let Some(status) = update.status {
            request.status = status;
        }

        request.updated_at = Utc::now();
        self.requests.replace(&request).await?;
        Ok(request)
    }

    pub async fn delete(&self, caller: &User, id: Uuid) -> Result<(), ApiError> {
        let request = self.find(id).await?;
        if request.status != LogisticsStatus::Pending {
            return Err(ApiError::invalid_state(
                "Cannot delete request after it has been accepted",
            ));
        }
        if !caller.can_manage(request.requester) {
            return Err(ApiError::forbidden(NOT_AUTHORIZED));
        }
        self.requests.delete(id).await?;
        info!("Logistics request {} deleted by {}", id, caller.id);
        Ok(())
    }

    /// Admin-only lifecycle step, optionally assigning a driver.
    pub async fn update_status(
        &self,
        caller: &User,
        id: Uuid,
        update: StatusUpdate,
    ) -> Result<LogisticsRequest, ApiError> {
        if !caller.is_admin {
            warn!("Non-admin {} attempted a status update on {}", caller.id, id);
            return Err(ApiError::forbidden(NOT_AUTHORIZED));
        }

        let mut request = self.find(id).await?;
        if !request.status.can_transition_to(update.status) {
            return Err(ApiError::invalid_state(format!(
                "Cannot move request from {} to {}",
                request.status, update.status
            )));
        }

        request.status = update.status;
        if let Some(driver) = update.assigned_driver {
            request.assigned_driver = Some(driver);
        }
        request.updated_at = Utc::now();
        self.requests.replace(&request).await?;

        info!("Logistics request {} is now {}", request.id, request.status);
        Ok(request)
    }

    async fn find(&self, id: Uuid) -> Result<LogisticsRequest, ApiError> {
        self.requests
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Logistics request not found"))
    }
}

fn validate_price(price: f64) -> Result<(), ApiError> {
    if price.is_nan() || price < 0.0 {
        return Err(ApiError::validation("Price cannot be negative"));
    }
    Ok(())
}
