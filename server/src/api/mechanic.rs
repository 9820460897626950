use super::{body, json, path_id, reject, set_profile_cookie, user};
use crate::{auth::RequireUser, State};
use model::schema::{MechanicInput, MechanicPatch};
use tide::{http::StatusCode, Request, Route};

pub(super) fn register(api: &mut Route<'_, State>) {
    api.at("/mechanics").with(RequireUser).post(create_mechanic);
    api.at("/mechanics/:mechanic_id").get(get_mechanic);
    api.at("/mechanics/:mechanic_id")
        .with(RequireUser)
        .patch(patch_mechanic);
}

async fn get_mechanic(req: Request<State>) -> tide::Result {
    let mechanic_id = path_id(&req, "mechanic_id")?;
    let mechanic = req
        .state()
        .services
        .mechanics
        .get_mechanic(mechanic_id)
        .await
        .map_err(reject)?;
    json(StatusCode::Ok, &mechanic)
}

async fn create_mechanic(mut req: Request<State>) -> tide::Result {
    let input: MechanicInput = body(&mut req).await?;
    let user = user(&req)?;
    let mechanic = req
        .state()
        .services
        .mechanics
        .create_mechanic(input, &user)
        .await
        .map_err(reject)?;
    let mut res = json(StatusCode::Created, &mechanic)?;
    set_profile_cookie(&mut res, "mechanic_id", mechanic.mechanic_id);
    Ok(res)
}

async fn patch_mechanic(mut req: Request<State>) -> tide::Result {
    let mechanic_id = path_id(&req, "mechanic_id")?;
    let patch: MechanicPatch = body(&mut req).await?;
    let user = user(&req)?;
    let mechanic = req
        .state()
        .services
        .mechanics
        .patch_mechanic(mechanic_id, patch, &user)
        .await
        .map_err(reject)?;
    json(StatusCode::Ok, &mechanic)
}
