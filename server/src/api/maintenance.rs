use super::{body, json, reject, user};
use crate::{auth::RequireUser, State};
use model::schema::{
    ProvidedMaintenanceCountryAssociation, ProvidedMaintenanceInput,
    ProvidedMaintenanceVehicleBrandAssociation,
};
use tide::{http::StatusCode, Request, Route};

pub(super) fn register(api: &mut Route<'_, State>) {
    let mut maintenance = api.at("/maintenance/provided_maintenance");
    maintenance.with(RequireUser);
    maintenance.post(create_provided_maintenance);
    maintenance
        .at("/countries")
        .post(create_country_association);
    maintenance
        .at("/vehicle_brands")
        .post(create_vehicle_brand_association);
}

async fn create_provided_maintenance(mut req: Request<State>) -> tide::Result {
    let input: ProvidedMaintenanceInput = body(&mut req).await?;
    let user = user(&req)?;
    let pm = req
        .state()
        .services
        .provided_maintenance
        .create_provided_maintenance(input, &user)
        .await
        .map_err(reject)?;
    json(StatusCode::Created, &pm)
}

async fn create_country_association(mut req: Request<State>) -> tide::Result {
    let input: ProvidedMaintenanceCountryAssociation = body(&mut req).await?;
    let user = user(&req)?;
    let association = req
        .state()
        .services
        .provided_maintenance
        .create_country_association(input, &user)
        .await
        .map_err(reject)?;
    json(StatusCode::Created, &association)
}

async fn create_vehicle_brand_association(mut req: Request<State>) -> tide::Result {
    let input: ProvidedMaintenanceVehicleBrandAssociation = body(&mut req).await?;
    let user = user(&req)?;
    let association = req
        .state()
        .services
        .provided_maintenance
        .create_vehicle_brand_association(input, &user)
        .await
        .map_err(reject)?;
    json(StatusCode::Created, &association)
}
