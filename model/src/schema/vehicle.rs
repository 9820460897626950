use crate::{error::Result, validate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vehicle manufacturer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleBrand {
    pub vehicle_brand_id: i16,
    pub name: String,
    /// Used to order brand pickers. Never shown to clients.
    #[serde(default, skip_serializing)]
    pub popular: bool,
    pub country_id: i16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleModel {
    pub vehicle_model_id: i32,
    pub name: String,
    pub vehicle_brand_id: i16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleGeneration {
    pub vehicle_generation_id: i32,
    pub name: String,
    pub start_year_production: i16,
    #[serde(default)]
    pub end_year_production: Option<i16>,
    pub vehicle_model_id: i32,
}

/// A customer's vehicle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_id: Uuid,
    /// Registration plate, normalized to upper case without whitespace.
    pub state_number: Option<String>,
    /// Vehicle identification number, normalized to upper case without whitespace.
    pub vin: Option<String>,
    pub vehicle_brand_id: i16,
    pub vehicle_model_id: i32,
    pub vehicle_generation_id: i32,
    pub customer_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleInput {
    #[serde(default)]
    pub state_number: Option<String>,
    #[serde(default)]
    pub vin: Option<String>,
    pub vehicle_brand_id: i16,
    pub vehicle_model_id: i32,
    pub vehicle_generation_id: i32,
    pub customer_id: Uuid,
}

impl Vehicle {
    /// Validate and normalize a new vehicle.
    ///
    /// This only checks the fields themselves. Whether the referenced catalogue entries and
    /// customer exist is up to the caller.
    pub fn new(input: VehicleInput) -> Result<Self> {
        Ok(Self {
            vehicle_id: Uuid::now_v7(),
            state_number: input
                .state_number
                .as_deref()
                .map(validate::state_number)
                .transpose()?,
            vin: input.vin.as_deref().map(validate::vin).transpose()?,
            vehicle_brand_id: input.vehicle_brand_id,
            vehicle_model_id: input.vehicle_model_id,
            vehicle_generation_id: input.vehicle_generation_id,
            customer_id: input.customer_id,
        })
    }
}

/// A [`Vehicle`] with its catalogue entries expanded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDetails {
    pub vehicle_id: Uuid,
    pub state_number: Option<String>,
    pub vin: Option<String>,
    pub customer_id: Uuid,
    pub vehicle_brand: VehicleBrand,
    pub vehicle_model: VehicleModel,
    pub vehicle_generation: VehicleGeneration,
}

impl VehicleDetails {
    pub fn new(
        vehicle: Vehicle,
        vehicle_brand: VehicleBrand,
        vehicle_model: VehicleModel,
        vehicle_generation: VehicleGeneration,
    ) -> Self {
        Self {
            vehicle_id: vehicle.vehicle_id,
            state_number: vehicle.state_number,
            vin: vehicle.vin,
            customer_id: vehicle.customer_id,
            vehicle_brand,
            vehicle_model,
            vehicle_generation,
        }
    }
}
