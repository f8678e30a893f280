//! Transport offers and delivery bookings built on the logistics endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::api::ApiClient;
use super::booking::{ActiveBooking, BookingState};
use super::error::Result;
use crate::models::{
    LogisticsQuery, LogisticsRequest, LogisticsStatus, LogisticsType, LogisticsUpdate,
    NewLogisticsRequest, Place, VehicleType,
};

pub const COLD_CHAIN_RANGE: &str = "2°C to 8°C";
const DEFAULT_DRIVER_IMAGE: &str =
    "https://images.unsplash.com/photo-1600486913747-55e5470d6f40?q=80&w=300";
const DEFAULT_DRIVER_RATING: f32 = 4.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureControl {
    pub available: bool,
    pub range: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverInfo {
    pub name: String,
    pub rating: f32,
    pub image: String,
    pub completed_agri_deliveries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transport {
    pub id: String,
    /// Display label such as "3-Ton Refrigerated Truck".
    #[serde(rename = "type")]
    pub label: String,
    pub capacity: String,
    pub location: String,
    pub price: f64,
    pub special_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_distance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_control: Option<TemperatureControl>,
    pub driver: DriverInfo,
}

pub fn vehicle_label(vehicle: VehicleType) -> &'static str {
    match vehicle {
        VehicleType::Refrigerated => "3-Ton Refrigerated Truck",
        VehicleType::Large => "3-Ton Truck",
        VehicleType::Medium => "Pick-up Truck",
        VehicleType::Small => "Small Van",
    }
}

pub fn vehicle_capacity(vehicle: VehicleType) -> &'static str {
    match vehicle {
        VehicleType::Refrigerated | VehicleType::Large => "3000kg",
        VehicleType::Medium => "1000kg",
        VehicleType::Small => "500kg",
    }
}

impl Transport {
    pub fn from_request(request: &LogisticsRequest) -> Self {
        let vehicle = request.vehicle_type;
        let location = request
            .pickup_location
            .as_ref()
            .map(|place| place.address.clone())
            .filter(|address| !address.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let special_features = request
            .special_instructions
            .as_deref()
            .map(|text| {
                text.split(',')
                    .map(str::trim)
                    .filter(|feature| !feature.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let driver_name = match request.assigned_driver {
            Some(driver) => format!("Driver {}", &driver.simple().to_string()[..8]),
            None => "Unassigned".to_string(),
        };

        Self {
            id: request.id.to_string(),
            label: vehicle_label(vehicle).to_string(),
            capacity: vehicle_capacity(vehicle).to_string(),
            location,
            price: request.price,
            special_features,
            estimated_distance: None,
            temperature_control: (vehicle == VehicleType::Refrigerated).then(|| {
                TemperatureControl {
                    available: true,
                    range: COLD_CHAIN_RANGE.to_string(),
                }
            }),
            driver: DriverInfo {
                name: driver_name,
                rating: DEFAULT_DRIVER_RATING,
                image: DEFAULT_DRIVER_IMAGE.to_string(),
                completed_agri_deliveries: 0,
            },
        }
    }

    /// Inverse of [`vehicle_label`]/[`vehicle_capacity`] for offers that did
    /// not come from a server record.
    pub fn vehicle_type(&self) -> VehicleType {
        if self.label.contains("Refrigerated") {
            VehicleType::Refrigerated
        } else if self.capacity.contains("3000") {
            VehicleType::Large
        } else if self.capacity.contains("1000") {
            VehicleType::Medium
        } else {
            VehicleType::Small
        }
    }

    pub fn to_request(
        &self,
        pickup: &str,
        delivery: &str,
        scheduled_date: DateTime<Utc>,
    ) -> NewLogisticsRequest {
        let instructions = self.special_features.join(", ");
        NewLogisticsRequest {
            kind: LogisticsType::Delivery,
            pickup_location: Some(Place::address(pickup)),
            delivery_location: Some(Place::address(delivery)),
            scheduled_date,
            items: Vec::new(),
            vehicle_type: self.vehicle_type(),
            special_instructions: (!instructions.is_empty()).then_some(instructions),
            price: self.price,
        }
    }
}

/// Offers shown when the server has nothing open.
pub fn sample_transports() -> Vec<Transport> {
    vec![
        Transport {
            id: "1".into(),
            label: vehicle_label(VehicleType::Refrigerated).into(),
            capacity: "3000kg".into(),
            location: "Harare".into(),
            price: 250.0,
            special_features: vec![
                "Temperature Controlled".into(),
                "GPS Tracking".into(),
                "Weatherproof".into(),
            ],
            estimated_distance: Some("45km".into()),
            temperature_control: Some(TemperatureControl {
                available: true,
                range: COLD_CHAIN_RANGE.into(),
            }),
            driver: DriverInfo {
                name: "David Moyo".into(),
                rating: 4.8,
                image: DEFAULT_DRIVER_IMAGE.into(),
                completed_agri_deliveries: 156,
            },
        },
        Transport {
            id: "2".into(),
            label: vehicle_label(VehicleType::Medium).into(),
            capacity: "1000kg".into(),
            location: "Bulawayo".into(),
            price: 150.0,
            special_features: vec!["Tarpaulin Cover".into(), "Quick Loading".into()],
            estimated_distance: Some("30km".into()),
            temperature_control: None,
            driver: DriverInfo {
                name: "Grace Ndlovu".into(),
                rating: 4.9,
                image: "https://images.unsplash.com/photo-1573497019940-1c28c88b4f3e?q=80&w=300"
                    .into(),
                completed_agri_deliveries: 89,
            },
        },
    ]
}

fn status_query(status: LogisticsStatus) -> LogisticsQuery {
    LogisticsQuery {
        status: Some(status),
        ..LogisticsQuery::default()
    }
}

/// Open (pending) requests as transport offers, or the samples when none exist.
#[instrument(skip(api))]
pub async fn available_transports(api: &ApiClient) -> Result<Vec<Transport>> {
    let list = api
        .logistics()
        .list(&status_query(LogisticsStatus::Pending))
        .await?;
    if list.requests.is_empty() {
        info!("No open logistics requests, offering sample transports");
        return Ok(sample_transports());
    }
    Ok(list.requests.iter().map(Transport::from_request).collect())
}

#[instrument(skip(api))]
pub async fn active_deliveries(api: &ApiClient) -> Result<Vec<LogisticsRequest>> {
    let list = api
        .logistics()
        .list(&status_query(LogisticsStatus::InProgress))
        .await?;
    Ok(list.requests)
}

/// Requester self-cancellation; only succeeds while the request is pending.
#[instrument(skip(api))]
pub async fn cancel_delivery(api: &ApiClient, id: Uuid) -> Result<LogisticsRequest> {
    let update = LogisticsUpdate {
        status: Some(LogisticsStatus::Cancelled),
        ..LogisticsUpdate::default()
    };
    api.logistics().update(id, &update).await
}

/// Records the booking optimistically, then confirms or rolls it back
/// depending on `POST /logistics`.
#[instrument(skip(api, booking, transport), fields(transport = %transport.label))]
pub async fn book_transport(
    api: &ApiClient,
    booking: &mut BookingState,
    transport: &Transport,
    pickup: &str,
    delivery: &str,
    scheduled_date: DateTime<Utc>,
) -> Result<LogisticsRequest> {
    booking.begin(ActiveBooking::pending(transport.clone(), pickup, delivery))?;

    let request = transport.to_request(pickup, delivery, scheduled_date);
    match api.logistics().create(&request).await {
        Ok(created) => {
            booking.confirm(&created)?;
            info!("Booked transport as request {}", created.id);
            Ok(created)
        }
        Err(e) => {
            warn!("Booking failed, rolling back: {}", e);
            booking.rollback();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(vehicle: VehicleType) -> LogisticsRequest {
        let now = Utc::now();
        LogisticsRequest {
            id: Uuid::new_v4(),
            requester: Uuid::new_v4(),
            kind: LogisticsType::Delivery,
            status: LogisticsStatus::Pending,
            pickup_location: Some(Place::address("Harare")),
            delivery_location: None,
            scheduled_date: now,
            items: vec![],
            vehicle_type: vehicle,
            special_instructions: Some("GPS Tracking, Weatherproof".into()),
            price: 250.0,
            assigned_driver: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn refrigerated_request_becomes_cold_chain_offer() {
        let transport = Transport::from_request(&request(VehicleType::Refrigerated));
        assert_eq!(transport.label, "3-Ton Refrigerated Truck");
        assert_eq!(
            transport.temperature_control.as_ref().map(|t| t.range.as_str()),
            Some("2°C to 8°C")
        );
        assert_eq!(transport.special_features, ["GPS Tracking", "Weatherproof"]);
        assert_eq!(transport.location, "Harare");
        assert_eq!(transport.driver.name, "Unassigned");
    }

    #[test]
    fn vehicle_mapping_round_trips_through_labels() {
        for vehicle in [
            VehicleType::Small,
            VehicleType::Medium,
            VehicleType::Large,
            VehicleType::Refrigerated,
        ] {
            let transport = Transport::from_request(&request(vehicle));
            assert_eq!(transport.vehicle_type(), vehicle);
            assert_eq!(transport.temperature_control.is_some(), vehicle == VehicleType::Refrigerated);
        }
    }

    #[test]
    fn booking_request_carries_features_and_price() {
        let transport = sample_transports().remove(1);
        let body = transport.to_request("Bulawayo", "Gweru", Utc::now());
        assert_eq!(body.kind, LogisticsType::Delivery);
        assert_eq!(body.vehicle_type, VehicleType::Medium);
        assert_eq!(
            body.special_instructions.as_deref(),
            Some("Tarpaulin Cover, Quick Loading")
        );
        assert_eq!(body.price, 150.0);
    }
}
