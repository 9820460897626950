//! Routes of version 1 of the API.
//!
//! Handlers translate between HTTP and the [services](model::services). Domain errors are mapped
//! to a status code by [`status`], and rendered by the [`ErrorBody`](crate::middleware::ErrorBody)
//! middleware.

use crate::State;
use model::{schema::User, Error};
use serde::{de::DeserializeOwned, Serialize};
use tide::{
    http::{cookies::Cookie, StatusCode},
    Body, Request, Response, Route,
};
use uuid::Uuid;

mod autoservice;
mod customer;
mod maintenance;
mod mechanic;
mod vehicle;

/// Cookies telling the client which kind of profile it last created.
const PROFILE_COOKIES: [&str; 3] = ["customer_id", "mechanic_id", "autoservice_id"];

/// Register all routes under `api`.
pub fn register(mut api: Route<'_, State>) {
    customer::register(&mut api);
    mechanic::register(&mut api);
    autoservice::register(&mut api);
    vehicle::register(&mut api);
    maintenance::register(&mut api);
}

/// The status code reporting a domain error.
pub fn status(err: &Error) -> StatusCode {
    match err {
        Error::NotFound { .. } => StatusCode::NotFound,
        Error::BelongsToAnotherUser { .. }
        | Error::NoAutoserviceAccess
        | Error::MissingPermission { .. } => StatusCode::Forbidden,
        Error::ModelDoesntMatchBrand
        | Error::GenerationDoesntMatchModel
        | Error::NoExecutor
        | Error::Invalid { .. } => StatusCode::BadRequest,
        Error::AlreadyExists { .. } => StatusCode::Conflict,
        Error::Store { .. } => StatusCode::InternalServerError,
    }
}

fn reject(err: Error) -> tide::Error {
    tide::Error::from_str(status(&err), err)
}

fn bad_request(msg: String) -> tide::Error {
    tide::Error::from_str(StatusCode::BadRequest, msg)
}

/// Parse a UUID path parameter.
fn path_id(req: &Request<State>, name: &str) -> tide::Result<Uuid> {
    let param = req.param(name)?;
    Uuid::parse_str(param).map_err(|err| bad_request(format!("invalid {name}: {err}")))
}

/// Parse a JSON request body.
async fn body<T: DeserializeOwned>(req: &mut Request<State>) -> tide::Result<T> {
    let bytes = req.body_bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| bad_request(format!("invalid request body: {err}")))
}

/// The user authenticated by [`RequireUser`](crate::auth::RequireUser).
fn user(req: &Request<State>) -> tide::Result<User> {
    req.ext::<User>().copied().ok_or_else(|| {
        tide::Error::from_str(StatusCode::Unauthorized, "missing authentication token")
    })
}

fn json(status: StatusCode, value: &impl Serialize) -> tide::Result {
    Ok(Response::builder(status)
        .body(Body::from_json(value)?)
        .build())
}

/// Set the cookie naming the profile the client just created, and clear the other profile
/// cookies.
fn set_profile_cookie(res: &mut Response, name: &'static str, id: Uuid) {
    for other in PROFILE_COOKIES.into_iter().filter(|other| *other != name) {
        let mut cookie = Cookie::named(other);
        cookie.set_path("/");
        res.remove_cookie(cookie);
    }
    res.insert_cookie(Cookie::build(name, id.to_string()).path("/").finish());
}
