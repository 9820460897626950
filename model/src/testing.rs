//! Fixtures for tests of this crate and of crates built on it.
//!
//! The reference data used here is the sample set shipped in `db/seed` at the root of the
//! workspace.

use crate::{
    db::{self, Connection},
    schema::*,
    services::Services,
};
use std::path::PathBuf;
use uuid::Uuid;

pub const RUSSIA: i16 = 1;
pub const GERMANY: i16 = 2;
pub const LADA: i16 = 1;
pub const BMW: i16 = 2;
pub const VESTA: i32 = 1;
pub const X5: i32 = 3;
pub const VESTA_I: i32 = 1;
pub const X5_G05: i32 = 4;
pub const OIL_CHANGE: i16 = 1;

/// The directory holding the sample reference data.
pub fn seed_dir() -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "..", "db", "seed"]
        .iter()
        .collect()
}

/// A store loaded with the sample reference data.
pub async fn store() -> Connection {
    let conn = Connection::create();
    db::setup(&conn, seed_dir()).await.unwrap();
    conn
}

/// Services backed by [`store`].
pub async fn services() -> Services {
    Services::new(store().await)
}

/// A fresh user.
pub fn user() -> User {
    User::new(Uuid::new_v4())
}

pub fn customer_input() -> CustomerInput {
    CustomerInput {
        name: "Ivan Petrov".into(),
        city: Some("Moscow".into()),
    }
}

pub fn mechanic_input() -> MechanicInput {
    MechanicInput {
        name: "Sergey".into(),
        description: Some("Engines and gearboxes".into()),
        city: "Kazan".into(),
        address: None,
        lon: Some(49.12),
        lat: Some(55.79),
        private: false,
        mobile: true,
    }
}

pub fn autoservice_input() -> AutoserviceInput {
    AutoserviceInput {
        name: "Garage 7".into(),
        description: None,
        itn: "7707083893".into(),
        psrn: "1027700132195".into(),
        city: "Moscow".into(),
        address: "Lenina 7".into(),
        lon: None,
        lat: None,
    }
}

/// A Lada Vesta owned by `customer_id`.
pub fn vehicle_input(customer_id: Uuid) -> VehicleInput {
    VehicleInput {
        state_number: Some("А123ВС77".into()),
        vin: Some("XTA210990Y2765432".into()),
        vehicle_brand_id: LADA,
        vehicle_model_id: VESTA,
        vehicle_generation_id: VESTA_I,
        customer_id,
    }
}
