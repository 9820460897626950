//! Errors reported by the data model.
//!
//! Every error displays as a message that can be shown to the client as-is.

use crate::schema::Permission;
use snafu::Snafu;
use strum::Display;

/// The kinds of record an [`Error`] can refer to.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Entity {
    #[strum(serialize = "country")]
    Country,
    #[strum(serialize = "customer")]
    Customer,
    #[strum(serialize = "mechanic")]
    Mechanic,
    #[strum(serialize = "autoservice")]
    Autoservice,
    #[strum(serialize = "autoservice member")]
    AutoserviceUser,
    #[strum(serialize = "vehicle brand")]
    VehicleBrand,
    #[strum(serialize = "vehicle model")]
    VehicleModel,
    #[strum(serialize = "vehicle generation")]
    VehicleGeneration,
    #[strum(serialize = "vehicle")]
    Vehicle,
    #[strum(serialize = "maintenance category")]
    ProvidedMaintenanceCategory,
    #[strum(serialize = "maintenance type")]
    ProvidedMaintenanceType,
    #[strum(serialize = "provided maintenance")]
    ProvidedMaintenance,
    #[strum(serialize = "link between provided maintenance and country")]
    ProvidedMaintenanceCountry,
    #[strum(serialize = "link between provided maintenance and vehicle brand")]
    ProvidedMaintenanceVehicleBrand,
}

/// Errors returned by the store and the services built on it.
#[derive(Clone, Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("{entity} not found"))]
    NotFound { entity: Entity },

    #[snafu(display("this {entity} belongs to another user"))]
    BelongsToAnotherUser { entity: Entity },

    #[snafu(display("you don't have access to this autoservice"))]
    NoAutoserviceAccess,

    #[snafu(display("you don't have the {permission} permission in this autoservice"))]
    MissingPermission { permission: Permission },

    #[snafu(display("this vehicle model doesn't belong to this vehicle brand"))]
    ModelDoesntMatchBrand,

    #[snafu(display("this vehicle generation doesn't belong to this vehicle model"))]
    GenerationDoesntMatchModel,

    #[snafu(display("provided maintenance needs a mechanic or an autoservice"))]
    NoExecutor,

    #[snafu(display("{entity} already exists"))]
    AlreadyExists { entity: Entity },

    #[snafu(display("invalid {field}: {message}"))]
    Invalid { field: &'static str, message: String },

    #[snafu(display("store error: {message}"))]
    Store { message: String },
}

impl Error {
    pub(crate) fn not_found(entity: Entity) -> Self {
        Self::NotFound { entity }
    }

    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    /// An inconsistency between records which the store should have prevented.
    pub(crate) fn dangling(from: Entity, to: Entity) -> Self {
        Self::Store {
            message: format!("{from} refers to a {to} which does not exist"),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
