use super::{body, json, path_id, reject, status};
use crate::{auth::RequireUser, State};
use model::{schema::VehicleInput, Error};
use tide::{http::StatusCode, Request, Route};

pub(super) fn register(api: &mut Route<'_, State>) {
    api.at("/vehicle").with(RequireUser).post(create_vehicle);
    api.at("/vehicle/:vehicle_id").get(get_vehicle);
}

async fn get_vehicle(req: Request<State>) -> tide::Result {
    let vehicle_id = path_id(&req, "vehicle_id")?;
    let vehicle = req
        .state()
        .services
        .vehicles
        .get_vehicle(vehicle_id)
        .await
        .map_err(reject)?;
    json(StatusCode::Ok, &vehicle)
}

async fn create_vehicle(mut req: Request<State>) -> tide::Result {
    let input: VehicleInput = body(&mut req).await?;
    let vehicle = req
        .state()
        .services
        .vehicles
        .create_vehicle(input)
        .await
        .map_err(|err| {
            // Anything other than bad input or a broken store means the vehicle conflicts with
            // the catalogue or with existing vehicles.
            let code = match &err {
                Error::Invalid { .. } | Error::Store { .. } => status(&err),
                _ => StatusCode::Conflict,
            };
            tide::Error::from_str(code, err)
        })?;
    json(StatusCode::Created, &vehicle)
}
