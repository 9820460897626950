//! Business operations on top of the [store](crate::db).
//!
//! Services check ownership and permissions on behalf of an authenticated [`User`], check that
//! the records a request refers to exist, and then read or write the store. Every refused request
//! is logged at `warn` level and every change at `info` level.
//!
//! [`User`]: crate::schema::User

use crate::db::Connection;

pub mod autoservice;
pub mod country;
pub mod customer;
pub mod maintenance;
pub mod mechanic;
pub mod vehicle;

pub use autoservice::{AutoserviceService, AutoserviceUserService};
pub use country::CountryService;
pub use customer::CustomerService;
pub use maintenance::ProvidedMaintenanceService;
pub use mechanic::MechanicService;
pub use vehicle::{VehicleCatalogue, VehicleService};

/// All services, sharing one store.
#[derive(Clone, Debug)]
pub struct Services {
    pub countries: CountryService,
    pub customers: CustomerService,
    pub mechanics: MechanicService,
    pub autoservices: AutoserviceService,
    pub catalogue: VehicleCatalogue,
    pub vehicles: VehicleService,
    pub provided_maintenance: ProvidedMaintenanceService,
}

impl Services {
    pub fn new(conn: Connection) -> Self {
        let countries = CountryService::new(conn.clone());
        let customers = CustomerService::new(conn.clone());
        let mechanics = MechanicService::new(conn.clone());
        let autoservices = AutoserviceService::new(conn.clone());
        let catalogue = VehicleCatalogue::new(conn.clone());
        let vehicles = VehicleService::new(conn.clone(), catalogue.clone(), customers.clone());
        let provided_maintenance = ProvidedMaintenanceService::new(
            conn,
            countries.clone(),
            catalogue.clone(),
            mechanics.clone(),
            autoservices.clone(),
        );
        Self {
            countries,
            customers,
            mechanics,
            autoservices,
            catalogue,
            vehicles,
            provided_maintenance,
        }
    }
}
