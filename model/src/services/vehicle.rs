use super::CustomerService;
use crate::{
    db::Connection,
    error::{Error, Result},
    schema::{
        Vehicle, VehicleBrand, VehicleDetails, VehicleGeneration, VehicleInput, VehicleModel,
    },
};
use uuid::Uuid;

/// Read access to the catalogue of vehicle brands, models and generations.
#[derive(Clone, Debug)]
pub struct VehicleCatalogue {
    conn: Connection,
}

impl VehicleCatalogue {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub async fn get_vehicle_brand(&self, vehicle_brand_id: i16) -> Result<VehicleBrand> {
        self.conn.get(&vehicle_brand_id).await.map_err(|err| {
            tracing::warn!(vehicle_brand_id, "vehicle brand does not exist");
            err
        })
    }

    pub async fn get_vehicle_model(&self, vehicle_model_id: i32) -> Result<VehicleModel> {
        self.conn.get(&vehicle_model_id).await.map_err(|err| {
            tracing::warn!(vehicle_model_id, "vehicle model does not exist");
            err
        })
    }

    pub async fn get_vehicle_generation(
        &self,
        vehicle_generation_id: i32,
    ) -> Result<VehicleGeneration> {
        self.conn.get(&vehicle_generation_id).await.map_err(|err| {
            tracing::warn!(vehicle_generation_id, "vehicle generation does not exist");
            err
        })
    }

    /// Check that a brand, model and generation exist and belong together.
    pub async fn validate_vehicle_params(
        &self,
        vehicle_brand_id: i16,
        vehicle_model_id: i32,
        vehicle_generation_id: i32,
    ) -> Result<(VehicleBrand, VehicleModel, VehicleGeneration)> {
        let brand = self.get_vehicle_brand(vehicle_brand_id).await?;
        let model = self.get_vehicle_model(vehicle_model_id).await?;
        if model.vehicle_brand_id != brand.vehicle_brand_id {
            tracing::warn!(vehicle_brand_id, vehicle_model_id, "model does not match brand");
            return Err(Error::ModelDoesntMatchBrand);
        }
        let generation = self.get_vehicle_generation(vehicle_generation_id).await?;
        if generation.vehicle_model_id != model.vehicle_model_id {
            tracing::warn!(
                vehicle_model_id,
                vehicle_generation_id,
                "generation does not match model"
            );
            return Err(Error::GenerationDoesntMatchModel);
        }
        Ok((brand, model, generation))
    }
}

#[derive(Clone, Debug)]
pub struct VehicleService {
    conn: Connection,
    catalogue: VehicleCatalogue,
    customers: CustomerService,
}

impl VehicleService {
    pub fn new(conn: Connection, catalogue: VehicleCatalogue, customers: CustomerService) -> Self {
        Self {
            conn,
            catalogue,
            customers,
        }
    }

    pub async fn get_vehicle(&self, vehicle_id: Uuid) -> Result<VehicleDetails> {
        let vehicle = self.conn.get::<Vehicle>(&vehicle_id).await.map_err(|err| {
            tracing::warn!(%vehicle_id, "vehicle does not exist");
            err
        })?;
        tracing::info!(?vehicle, "got vehicle");
        self.expand(vehicle).await
    }

    pub async fn create_vehicle(&self, input: VehicleInput) -> Result<VehicleDetails> {
        let vehicle = Vehicle::new(input).map_err(|err| {
            tracing::warn!("invalid vehicle: {err}");
            err
        })?;
        let (brand, model, generation) = self
            .catalogue
            .validate_vehicle_params(
                vehicle.vehicle_brand_id,
                vehicle.vehicle_model_id,
                vehicle.vehicle_generation_id,
            )
            .await?;
        self.customers.get_customer(vehicle.customer_id).await?;
        let vehicle = self.conn.insert(vehicle).await.map_err(|err| {
            tracing::warn!("cannot create vehicle: {err}");
            err
        })?;
        tracing::info!(?vehicle, "created vehicle");
        Ok(VehicleDetails::new(vehicle, brand, model, generation))
    }

    async fn expand(&self, vehicle: Vehicle) -> Result<VehicleDetails> {
        let (brand, model, generation) = self
            .catalogue
            .validate_vehicle_params(
                vehicle.vehicle_brand_id,
                vehicle.vehicle_model_id,
                vehicle.vehicle_generation_id,
            )
            .await
            .map_err(|err| Error::Store {
                message: format!("vehicle {} has an invalid catalogue entry: {err}", vehicle.vehicle_id),
            })?;
        Ok(VehicleDetails::new(vehicle, brand, model, generation))
    }
}
