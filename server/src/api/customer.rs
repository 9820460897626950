use super::{body, json, path_id, reject, set_profile_cookie, user};
use crate::{auth::RequireUser, State};
use model::schema::{CustomerInput, CustomerPatch};
use tide::{http::StatusCode, Request, Route};

pub(super) fn register(api: &mut Route<'_, State>) {
    api.at("/customers").with(RequireUser).post(create_customer);
    api.at("/customers/:customer_id").get(get_customer);
    api.at("/customers/:customer_id")
        .with(RequireUser)
        .patch(patch_customer);
}

async fn get_customer(req: Request<State>) -> tide::Result {
    let customer_id = path_id(&req, "customer_id")?;
    let customer = req
        .state()
        .services
        .customers
        .get_customer(customer_id)
        .await
        .map_err(reject)?;
    json(StatusCode::Ok, &customer)
}

async fn create_customer(mut req: Request<State>) -> tide::Result {
    let input: CustomerInput = body(&mut req).await?;
    let user = user(&req)?;
    let customer = req
        .state()
        .services
        .customers
        .create_customer(input, &user)
        .await
        .map_err(reject)?;
    let mut res = json(StatusCode::Created, &customer)?;
    set_profile_cookie(&mut res, "customer_id", customer.customer_id);
    Ok(res)
}

async fn patch_customer(mut req: Request<State>) -> tide::Result {
    let customer_id = path_id(&req, "customer_id")?;
    let patch: CustomerPatch = body(&mut req).await?;
    let user = user(&req)?;
    let customer = req
        .state()
        .services
        .customers
        .patch_customer(customer_id, patch, &user)
        .await
        .map_err(reject)?;
    json(StatusCode::Ok, &customer)
}
