use super::User;
use crate::{error::Result, validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An independent mechanic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mechanic {
    pub mechanic_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub city: String,
    pub address: Option<String>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    /// Whether the mechanic works from a private garage rather than a business address.
    pub private: bool,
    /// Whether the mechanic comes to the customer.
    pub mobile: bool,
    /// The user this profile belongs to. Each user has at most one mechanic profile.
    pub uid: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MechanicInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub city: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    pub private: bool,
    pub mobile: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MechanicPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub mobile: Option<bool>,
}

/// Limits shared by mechanics and autoservices.
pub(crate) fn validate_profile(
    name: Option<&str>,
    description: Option<&str>,
    city: Option<&str>,
    address: Option<&str>,
    lon: Option<f64>,
    lat: Option<f64>,
) -> Result<()> {
    if let Some(name) = name {
        validate::length("name", name, 2, 150)?;
    }
    validate::optional_length("description", description, 1500)?;
    validate::optional_length("city", city, 200)?;
    validate::optional_length("address", address, 500)?;
    validate::longitude(lon)?;
    validate::latitude(lat)
}

impl Mechanic {
    /// Create a new mechanic profile for `user`.
    pub fn new(input: MechanicInput, user: &User) -> Result<Self> {
        validate_profile(
            Some(&input.name),
            input.description.as_deref(),
            Some(&input.city),
            input.address.as_deref(),
            input.lon,
            input.lat,
        )?;
        Ok(Self {
            mechanic_id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
            city: input.city,
            address: input.address,
            lon: input.lon,
            lat: input.lat,
            private: input.private,
            mobile: input.mobile,
            uid: user.uid,
            created_at: Utc::now(),
            updated_at: None,
        })
    }
}

impl MechanicPatch {
    /// Validate this patch and apply it to `mechanic`.
    ///
    /// If the patch is invalid, `mechanic` is left unchanged.
    pub fn apply(self, mechanic: &mut Mechanic) -> Result<()> {
        validate_profile(
            self.name.as_deref(),
            self.description.as_deref(),
            self.city.as_deref(),
            self.address.as_deref(),
            self.lon,
            self.lat,
        )?;

        if let Some(name) = self.name {
            mechanic.name = name;
        }
        if let Some(description) = self.description {
            mechanic.description = Some(description);
        }
        if let Some(city) = self.city {
            mechanic.city = city;
        }
        if let Some(address) = self.address {
            mechanic.address = Some(address);
        }
        if let Some(lon) = self.lon {
            mechanic.lon = Some(lon);
        }
        if let Some(lat) = self.lat {
            mechanic.lat = Some(lat);
        }
        if let Some(private) = self.private {
            mechanic.private = private;
        }
        if let Some(mobile) = self.mobile {
            mechanic.mobile = mobile;
        }
        mechanic.updated_at = Some(Utc::now());
        Ok(())
    }
}
