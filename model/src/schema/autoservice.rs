use super::{mechanic::validate_profile, Permission, User};
use crate::{error::Result, validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use uuid::Uuid;

/// A car repair business.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Autoservice {
    pub autoservice_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Taxpayer identification number.
    pub itn: String,
    /// Primary state registration number.
    pub psrn: String,
    pub city: String,
    pub address: String,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoserviceInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub itn: String,
    pub psrn: String,
    #[serde(default)]
    pub city: String,
    pub address: String,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoservicePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Autoservice {
    pub fn new(input: AutoserviceInput) -> Result<Self> {
        validate_profile(
            Some(&input.name),
            input.description.as_deref(),
            Some(&input.city),
            Some(&input.address),
            input.lon,
            input.lat,
        )?;
        validate::itn(&input.itn)?;
        validate::psrn(&input.psrn)?;
        Ok(Self {
            autoservice_id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
            itn: input.itn,
            psrn: input.psrn,
            city: input.city,
            address: input.address,
            lon: input.lon,
            lat: input.lat,
            created_at: Utc::now(),
            updated_at: None,
        })
    }
}

impl AutoservicePatch {
    /// Validate this patch and apply it to `autoservice`.
    ///
    /// If the patch is invalid, `autoservice` is left unchanged.
    pub fn apply(self, autoservice: &mut Autoservice) -> Result<()> {
        validate_profile(
            self.name.as_deref(),
            self.description.as_deref(),
            None,
            None,
            None,
            None,
        )?;
        if let Some(name) = self.name {
            autoservice.name = name;
        }
        if let Some(description) = self.description {
            autoservice.description = Some(description);
        }
        autoservice.updated_at = Some(Utc::now());
        Ok(())
    }
}

/// Membership of a user in an [`Autoservice`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoserviceUser {
    pub uid: Uuid,
    pub autoservice_id: Uuid,
    pub permissions: Vec<Permission>,
}

impl AutoserviceUser {
    /// A member holding every permission.
    pub fn owner(autoservice_id: Uuid, user: &User) -> Self {
        Self {
            uid: user.uid,
            autoservice_id,
            permissions: Permission::iter().collect(),
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}
