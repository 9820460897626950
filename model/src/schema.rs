//! The entities stored by the service and the shapes in which clients create and modify them.
//!
//! Each entity `X` which clients can create comes with an `XInput` type, holding exactly the
//! writable fields, and a constructor `X::new` which validates the input. Entities which clients
//! can modify also come with an `XPatch` type, whose fields are all optional: `None` leaves the
//! corresponding field unchanged. Both reject unknown fields when deserialized.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uuid::Uuid;

pub mod autoservice;
pub mod customer;
pub mod maintenance;
pub mod mechanic;
pub mod vehicle;

pub use autoservice::{Autoservice, AutoserviceInput, AutoservicePatch, AutoserviceUser};
pub use customer::{Customer, CustomerInput, CustomerPatch};
pub use maintenance::{
    ProvidedMaintenance, ProvidedMaintenanceCategory, ProvidedMaintenanceCountryAssociation,
    ProvidedMaintenanceDetails, ProvidedMaintenanceInput, ProvidedMaintenanceType,
    ProvidedMaintenanceVehicleBrandAssociation,
};
pub use mechanic::{Mechanic, MechanicInput, MechanicPatch};
pub use vehicle::{
    Vehicle, VehicleBrand, VehicleDetails, VehicleGeneration, VehicleInput, VehicleModel,
};

/// An authenticated user.
///
/// Users are managed by an external identity provider. The service only ever sees their ID, which
/// it uses to decide who owns which records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct User {
    pub uid: Uuid,
}

impl User {
    pub fn new(uid: Uuid) -> Self {
        Self { uid }
    }
}

/// Something a member of an [`Autoservice`] is allowed to do on its behalf.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Permission {
    /// Modify the autoservice itself.
    #[serde(rename = "autoservice:manage")]
    #[strum(serialize = "autoservice:manage")]
    Manage,
    /// Offer maintenance in the name of the autoservice.
    #[serde(rename = "autoservice:manage_provided_maintenance")]
    #[strum(serialize = "autoservice:manage_provided_maintenance")]
    ManageProvidedMaintenance,
}

/// A country, used to say where brands come from and where maintenance is offered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Country {
    pub country_id: i16,
    pub name: String,
}
