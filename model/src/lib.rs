//! Data model for the products catalogue: vehicle owners, mechanics, autoservices, the vehicles
//! they work on and the maintenance they offer.

pub mod db;
pub mod error;
pub mod logging;
pub mod schema;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

mod validate;

pub use error::{Entity, Error, Result};
pub use logging::{init_logging, init_logging_as, LogFormat};
