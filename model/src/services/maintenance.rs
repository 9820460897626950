use super::{AutoserviceService, CountryService, MechanicService, VehicleCatalogue};
use crate::{
    db::Connection,
    error::{Entity, Error, Result},
    schema::{
        Autoservice, Mechanic, ProvidedMaintenance, ProvidedMaintenanceCountryAssociation,
        ProvidedMaintenanceDetails, ProvidedMaintenanceInput, ProvidedMaintenanceType,
        ProvidedMaintenanceVehicleBrandAssociation, User,
    },
};
use futures::future::try_join_all;
use uuid::Uuid;

/// Maintenance offered by mechanics and autoservices.
#[derive(Clone, Debug)]
pub struct ProvidedMaintenanceService {
    conn: Connection,
    countries: CountryService,
    catalogue: VehicleCatalogue,
    mechanics: MechanicService,
    autoservices: AutoserviceService,
}

impl ProvidedMaintenanceService {
    pub fn new(
        conn: Connection,
        countries: CountryService,
        catalogue: VehicleCatalogue,
        mechanics: MechanicService,
        autoservices: AutoserviceService,
    ) -> Self {
        Self {
            conn,
            countries,
            catalogue,
            mechanics,
            autoservices,
        }
    }

    pub async fn get_provided_maintenance_type(
        &self,
        provided_maintenance_type_id: i16,
    ) -> Result<ProvidedMaintenanceType> {
        self.conn
            .get(&provided_maintenance_type_id)
            .await
            .map_err(|err| {
                tracing::warn!(provided_maintenance_type_id, "maintenance type does not exist");
                err
            })
    }

    /// Read back an offer with its associations expanded.
    #[cfg(test)]
    async fn get_provided_maintenance(
        &self,
        provided_maintenance_id: Uuid,
    ) -> Result<ProvidedMaintenanceDetails> {
        let pm = self
            .conn
            .get::<ProvidedMaintenance>(&provided_maintenance_id)
            .await
            .map_err(|err| {
                tracing::warn!(%provided_maintenance_id, "provided maintenance does not exist");
                err
            })?;
        let mechanic = match pm.mechanic_id {
            Some(id) => Some(self.mechanics.get_mechanic(id).await?),
            None => None,
        };
        let autoservice = match pm.autoservice_id {
            Some(id) => Some(self.autoservices.get_autoservice(id).await?),
            None => None,
        };
        self.expand(pm, mechanic, autoservice).await
    }

    /// Offer new maintenance on behalf of a mechanic, an autoservice, or both.
    ///
    /// `user` must own the mechanic profile and hold the maintenance permission in the
    /// autoservice.
    pub async fn create_provided_maintenance(
        &self,
        input: ProvidedMaintenanceInput,
        user: &User,
    ) -> Result<ProvidedMaintenanceDetails> {
        let pm = ProvidedMaintenance::new(input).map_err(|err| {
            tracing::warn!(uid = %user.uid, "invalid provided maintenance: {err}");
            err
        })?;
        self.get_provided_maintenance_type(pm.provided_maintenance_type_id)
            .await?;
        let (mechanic, autoservice) = self
            .validate_executors(pm.mechanic_id, pm.autoservice_id, user)
            .await?;
        if mechanic.is_none() && autoservice.is_none() {
            tracing::warn!(uid = %user.uid, "provided maintenance without executor");
            return Err(Error::NoExecutor);
        }
        let pm = self.conn.insert(pm).await?;
        tracing::info!(?pm, "created provided maintenance");
        self.expand(pm, mechanic, autoservice).await
    }

    /// Offer existing maintenance in another country.
    pub async fn create_country_association(
        &self,
        input: ProvidedMaintenanceCountryAssociation,
        user: &User,
    ) -> Result<ProvidedMaintenanceCountryAssociation> {
        self.validate_owner(input.provided_maintenance_id, user)
            .await?;
        self.countries.get_country(input.country_id).await?;
        let association = self.conn.insert(input).await.map_err(|err| {
            tracing::warn!(?input, "cannot link maintenance to country: {err}");
            err
        })?;
        tracing::info!(?association, "linked maintenance to country");
        Ok(association)
    }

    /// Offer existing maintenance for another vehicle brand.
    pub async fn create_vehicle_brand_association(
        &self,
        input: ProvidedMaintenanceVehicleBrandAssociation,
        user: &User,
    ) -> Result<ProvidedMaintenanceVehicleBrandAssociation> {
        self.validate_owner(input.provided_maintenance_id, user)
            .await?;
        self.catalogue
            .get_vehicle_brand(input.vehicle_brand_id)
            .await?;
        let association = self.conn.insert(input).await.map_err(|err| {
            tracing::warn!(?input, "cannot link maintenance to vehicle brand: {err}");
            err
        })?;
        tracing::info!(?association, "linked maintenance to vehicle brand");
        Ok(association)
    }

    /// Check that `user` controls every executor of an existing offer.
    async fn validate_owner(&self, provided_maintenance_id: Uuid, user: &User) -> Result<()> {
        let pm = self
            .conn
            .get::<ProvidedMaintenance>(&provided_maintenance_id)
            .await
            .map_err(|err| {
                tracing::warn!(%provided_maintenance_id, "provided maintenance does not exist");
                err
            })?;
        self.validate_executors(pm.mechanic_id, pm.autoservice_id, user)
            .await?;
        Ok(())
    }

    async fn validate_executors(
        &self,
        mechanic_id: Option<Uuid>,
        autoservice_id: Option<Uuid>,
        user: &User,
    ) -> Result<(Option<Mechanic>, Option<Autoservice>)> {
        let mechanic = match mechanic_id {
            Some(id) => {
                let mechanic = self.mechanics.get_mechanic(id).await?;
                MechanicService::validate_mechanic_owner(&mechanic, user)?;
                Some(mechanic)
            }
            None => None,
        };
        let autoservice = match autoservice_id {
            Some(id) => {
                let autoservice = self.autoservices.get_autoservice(id).await?;
                self.autoservices
                    .validate_manage_provided_maintenance(&autoservice, user)
                    .await?;
                Some(autoservice)
            }
            None => None,
        };
        Ok((mechanic, autoservice))
    }

    async fn expand(
        &self,
        pm: ProvidedMaintenance,
        mechanic: Option<Mechanic>,
        autoservice: Option<Autoservice>,
    ) -> Result<ProvidedMaintenanceDetails> {
        let id = pm.provided_maintenance_id;
        let provided_maintenance_type = self
            .conn
            .get::<ProvidedMaintenanceType>(&pm.provided_maintenance_type_id)
            .await
            .map_err(|_| {
                Error::dangling(
                    Entity::ProvidedMaintenance,
                    Entity::ProvidedMaintenanceType,
                )
            })?;
        let countries = self
            .conn
            .filter::<ProvidedMaintenanceCountryAssociation>(|a| a.provided_maintenance_id == id)
            .await;
        let countries = try_join_all(
            countries
                .iter()
                .map(|a| self.countries.get_country(a.country_id)),
        )
        .await?;
        let brands = self
            .conn
            .filter::<ProvidedMaintenanceVehicleBrandAssociation>(|a| {
                a.provided_maintenance_id == id
            })
            .await;
        let vehicle_brands = try_join_all(
            brands
                .iter()
                .map(|a| self.catalogue.get_vehicle_brand(a.vehicle_brand_id)),
        )
        .await?;
        Ok(ProvidedMaintenanceDetails {
            provided_maintenance_id: id,
            price: pm.price,
            description: pm.description,
            provided_maintenance_type,
            mechanic,
            autoservice,
            countries,
            vehicle_brands,
        })
    }
}
