//! Logistics requests and their status lifecycle.
//!
//! ```text
//! pending -> accepted -> in_progress -> completed
//!    \__________\____________\______-> cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogisticsType {
    Pickup,
    Delivery,
    Storage,
}

impl LogisticsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
            Self::Storage => "storage",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogisticsStatus {
    #[default]
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl LogisticsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Staying put is allowed for non-terminal states so an admin can
    /// reassign the driver without moving the request forward.
    pub fn can_transition_to(&self, next: LogisticsStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if *self == next {
            return true;
        }
        match self {
            Self::Pending => matches!(next, Self::Accepted | Self::Cancelled),
            Self::Accepted => matches!(next, Self::InProgress | Self::Cancelled),
            Self::InProgress => matches!(next, Self::Completed | Self::Cancelled),
            Self::Completed | Self::Cancelled => false,
        }
    }
}

impl fmt::Display for LogisticsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Small,
    Medium,
    Large,
    Refrigerated,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Refrigerated => "refrigerated",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Place {
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Place {
    pub fn address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            coordinates: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticsItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Uuid>,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogisticsRequest {
    pub id: Uuid,
    pub requester: Uuid,
    #[serde(rename = "type")]
    pub kind: LogisticsType,
    pub status: LogisticsStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<Place>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<Place>,
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<LogisticsItem>,
    pub vehicle_type: VehicleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_driver: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLogisticsRequest {
    #[serde(rename = "type")]
    pub kind: LogisticsType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<Place>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<Place>,
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<LogisticsItem>,
    pub vehicle_type: VehicleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    pub price: f64,
}

/// Requester-side edit. `status` only accepts `cancelled`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogisticsUpdate {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LogisticsType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<Place>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<Place>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LogisticsItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LogisticsStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: LogisticsStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_driver: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogisticsQuery {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LogisticsType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LogisticsStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use LogisticsStatus::*;

    #[test]
    fn forward_progression_is_allowed() {
        assert!(Pending.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
    }

    #[test]
    fn cancellation_from_any_open_state() {
        for status in [Pending, Accepted, InProgress] {
            assert!(status.can_transition_to(Cancelled), "{status}");
        }
    }

    #[test]
    fn terminal_states_are_frozen() {
        for next in [Pending, Accepted, InProgress, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn skipping_and_going_back_are_rejected() {
        assert!(!Pending.can_transition_to(InProgress));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Accepted.can_transition_to(Pending));
        assert!(!InProgress.can_transition_to(Accepted));
    }

    #[test]
    fn same_status_is_a_noop_for_open_requests() {
        assert!(Accepted.can_transition_to(Accepted));
        assert!(!Completed.can_transition_to(Completed));
    }

    #[test]
    fn wire_names() {
        assert_eq!(
            serde_json::to_value(InProgress).unwrap(),
            serde_json::json!("in_progress")
        );
        let parsed: LogisticsQuery =
            serde_json::from_value(serde_json::json!({"type": "pickup", "status": "accepted"}))
                .unwrap();
        assert_eq!(parsed.kind, Some(LogisticsType::Pickup));
        assert_eq!(parsed.status, Some(Accepted));
    }
}
