use super::{Autoservice, Country, Mechanic, VehicleBrand};
use crate::{error::Result, validate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidedMaintenanceCategory {
    pub provided_maintenance_category_id: i16,
    pub name: String,
}

/// A kind of work, such as an oil change, grouped into a [`ProvidedMaintenanceCategory`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidedMaintenanceType {
    pub provided_maintenance_type_id: i16,
    pub name: String,
    pub provided_maintenance_category_id: i16,
}

/// Maintenance offered by a mechanic, an autoservice, or both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvidedMaintenance {
    pub provided_maintenance_id: Uuid,
    /// Price in the local currency, rounded to cents.
    pub price: f64,
    pub description: Option<String>,
    pub provided_maintenance_type_id: i16,
    pub mechanic_id: Option<Uuid>,
    pub autoservice_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidedMaintenanceInput {
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    pub provided_maintenance_type_id: i16,
    #[serde(default)]
    pub mechanic_id: Option<Uuid>,
    #[serde(default)]
    pub autoservice_id: Option<Uuid>,
}

impl ProvidedMaintenance {
    /// Validate a new offer.
    ///
    /// Whether the type and executors exist, and whether at least one executor is given, is up to
    /// the caller.
    pub fn new(input: ProvidedMaintenanceInput) -> Result<Self> {
        let price = validate::price(input.price)?;
        validate::optional_length("description", input.description.as_deref(), 500)?;
        Ok(Self {
            provided_maintenance_id: Uuid::now_v7(),
            price,
            description: input.description,
            provided_maintenance_type_id: input.provided_maintenance_type_id,
            mechanic_id: input.mechanic_id,
            autoservice_id: input.autoservice_id,
        })
    }
}

/// Offers [`ProvidedMaintenance`] in a country.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidedMaintenanceCountryAssociation {
    pub provided_maintenance_id: Uuid,
    pub country_id: i16,
}

/// Offers [`ProvidedMaintenance`] for vehicles of a brand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidedMaintenanceVehicleBrandAssociation {
    pub provided_maintenance_id: Uuid,
    pub vehicle_brand_id: i16,
}

/// A [`ProvidedMaintenance`] with its type, executors and associations expanded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvidedMaintenanceDetails {
    pub provided_maintenance_id: Uuid,
    pub price: f64,
    pub description: Option<String>,
    pub provided_maintenance_type: ProvidedMaintenanceType,
    pub mechanic: Option<Mechanic>,
    pub autoservice: Option<Autoservice>,
    pub countries: Vec<Country>,
    pub vehicle_brands: Vec<VehicleBrand>,
}
