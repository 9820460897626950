use super::User;
use crate::{error::Result, validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vehicle owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: Uuid,
    pub name: String,
    pub city: Option<String>,
    /// The user this profile belongs to. Each user has at most one customer profile.
    pub uid: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerInput {
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

fn validate_name(name: &str) -> Result<()> {
    validate::length("name", name, 2, 150)
}

fn validate_city(city: Option<&str>) -> Result<()> {
    validate::optional_length("city", city, 200)
}

impl Customer {
    /// Create a new customer profile for `user`.
    pub fn new(input: CustomerInput, user: &User) -> Result<Self> {
        validate_name(&input.name)?;
        validate_city(input.city.as_deref())?;
        Ok(Self {
            customer_id: Uuid::now_v7(),
            name: input.name,
            city: input.city,
            uid: user.uid,
            created_at: Utc::now(),
            updated_at: None,
        })
    }
}

impl CustomerPatch {
    /// Validate this patch and apply it to `customer`.
    ///
    /// If the patch is invalid, `customer` is left unchanged.
    pub fn apply(self, customer: &mut Customer) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        validate_city(self.city.as_deref())?;

        if let Some(name) = self.name {
            customer.name = name;
        }
        if let Some(city) = self.city {
            customer.city = Some(city);
        }
        customer.updated_at = Some(Utc::now());
        Ok(())
    }
}
