use super::{body, json, path_id, reject, set_profile_cookie, user};
use crate::{auth::RequireUser, State};
use model::schema::{AutoserviceInput, AutoservicePatch};
use tide::{http::StatusCode, Request, Route};

pub(super) fn register(api: &mut Route<'_, State>) {
    api.at("/autoservices")
        .with(RequireUser)
        .post(create_autoservice);
    api.at("/autoservices/:autoservice_id").get(get_autoservice);
    api.at("/autoservices/:autoservice_id")
        .with(RequireUser)
        .patch(patch_autoservice);
}

async fn get_autoservice(req: Request<State>) -> tide::Result {
    let autoservice_id = path_id(&req, "autoservice_id")?;
    let autoservice = req
        .state()
        .services
        .autoservices
        .get_autoservice(autoservice_id)
        .await
        .map_err(reject)?;
    json(StatusCode::Ok, &autoservice)
}

async fn create_autoservice(mut req: Request<State>) -> tide::Result {
    let input: AutoserviceInput = body(&mut req).await?;
    let user = user(&req)?;
    let autoservice = req
        .state()
        .services
        .autoservices
        .create_autoservice(input, &user)
        .await
        .map_err(reject)?;
    let mut res = json(StatusCode::Created, &autoservice)?;
    set_profile_cookie(&mut res, "autoservice_id", autoservice.autoservice_id);
    Ok(res)
}

async fn patch_autoservice(mut req: Request<State>) -> tide::Result {
    let autoservice_id = path_id(&req, "autoservice_id")?;
    let patch: AutoservicePatch = body(&mut req).await?;
    let user = user(&req)?;
    let autoservice = req
        .state()
        .services
        .autoservices
        .patch_autoservice(autoservice_id, patch, &user)
        .await
        .map_err(reject)?;
    json(StatusCode::Ok, &autoservice)
}
