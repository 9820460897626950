#![cfg(test)]

//! End-to-end tests of the HTTP API.
//!
//! Each test starts a real server on an unused port, loaded with the sample reference data from
//! `db/seed`, and drives it with an HTTP client.

use super::{auth, Environment, Options, TlsOptions};
use ansi_term::Color;
use anyhow::Error;
use async_std::{
    net::TcpStream,
    task::{sleep, spawn},
};
use chrono::Duration;
use futures::future::join_all;
use model::{db, schema::User, testing};
use portpicker::pick_unused_port;
use serde_json::{json, Value};
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::time::Duration as StdDuration;
use surf::{
    http::{Method, StatusCode},
    Client, RequestBuilder,
};
use uuid::Uuid;

const SECRET: &str = "test secret";

struct TestServer {
    client: Client,
    prefix: String,
    auth: auth::Authenticator,
}

/// The parts of a response the tests look at.
#[derive(Debug)]
struct Reply {
    status: StatusCode,
    body: Value,
    cookies: Vec<String>,
    trace_id: Option<String>,
}

impl Reply {
    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find_map(|cookie| cookie.strip_prefix(&format!("{name}=")))
            .map(|rest| rest.split(';').next().unwrap_or_default())
    }
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(configure: impl FnOnce(&mut Options)) -> Self {
        model::init_logging();

        let port = pick_unused_port().unwrap();
        let mut opt = options(port);
        configure(&mut opt);
        let prefix = opt.api_prefix();
        let auth = auth::Authenticator::new(&opt.auth).await.unwrap();
        spawn(async move {
            opt.serve().await.unwrap();
            tracing::warn!("server exited");
        });

        let client: Client = surf::Config::default()
            .set_base_url(format!("http://127.0.0.1:{port}").parse().unwrap())
            .try_into()
            .unwrap();
        wait_for_server(&client).await.unwrap();
        Self {
            client,
            prefix,
            auth,
        }
    }

    fn token(&self, user: &User) -> String {
        self.auth.issue(user, Duration::minutes(5)).unwrap()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.prefix)
    }

    async fn get(&self, path: &str) -> Result<Reply, Error> {
        send(self.client.get(self.url(path)), None, None).await
    }

    async fn post(&self, path: &str, user: &User, body: Value) -> Result<Reply, Error> {
        send(
            self.client.post(self.url(path)),
            Some(&self.token(user)),
            Some(&body),
        )
        .await
    }

    async fn patch(&self, path: &str, user: &User, body: Value) -> Result<Reply, Error> {
        send(
            self.client.patch(self.url(path)),
            Some(&self.token(user)),
            Some(&body),
        )
        .await
    }

    async fn create_customer(&self, user: &User) -> Value {
        let reply = self
            .post("/customers", user, json!(testing::customer_input()))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::Created, "{:?}", reply.body);
        reply.body
    }

    async fn create_mechanic(&self, user: &User) -> Value {
        let reply = self
            .post("/mechanics", user, json!(testing::mechanic_input()))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::Created, "{:?}", reply.body);
        reply.body
    }

    async fn create_autoservice(&self, user: &User) -> Value {
        let reply = self
            .post("/autoservices", user, json!(testing::autoservice_input()))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::Created, "{:?}", reply.body);
        reply.body
    }
}

fn options(port: u16) -> Options {
    Options {
        host: "127.0.0.1".into(),
        port,
        app_name: "products".into(),
        env: Environment::Local,
        log_format: None,
        tls: TlsOptions::default(),
        auth: auth::Options::new(SECRET),
        db: db::Options {
            seed_dir: testing::seed_dir(),
        },
    }
}

/// TLS options pointing at the self-signed test certificate in `db/test/tls`.
fn test_certificate() -> TlsOptions {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../db/test/tls");
    TlsOptions {
        tls_cert: Some(dir.join("cert.pem")),
        tls_key: Some(dir.join("key.pem")),
    }
}

async fn send(
    mut req: RequestBuilder,
    token: Option<&str>,
    body: Option<&Value>,
) -> Result<Reply, Error> {
    if let Some(token) = token {
        req = req.header("Authorization", format!("Bearer {token}"));
    }
    if let Some(body) = body {
        req = req.body_json(body).map_err(Error::msg)?;
    }
    let mut res = req.send().await.map_err(Error::msg)?;
    let cookies = res
        .header("Set-Cookie")
        .map(|values| values.iter().map(|v| v.as_str().to_string()).collect())
        .unwrap_or_default();
    let trace_id = res
        .header("X-Trace-Id")
        .map(|values| values.last().as_str().to_string());
    let text = res.body_string().await.map_err(Error::msg)?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text)
            .map_err(|err| Error::msg(format!("cannot parse response body {text:?}: {err}")))?
    };
    Ok(Reply {
        status: res.status(),
        body,
        cookies,
        trace_id,
    })
}

async fn wait_for_server(client: &Client) -> Result<(), Error> {
    const MAX_CONNECT_RETRIES: usize = 60;

    for _ in 0..MAX_CONNECT_RETRIES {
        match client.connect("/").await {
            Ok(_) => return Ok(()),
            Err(err) => {
                tracing::warn!("waiting for server to start: {err}");
                sleep(StdDuration::from_secs(1)).await;
            }
        }
    }

    Err(Error::msg("timed out waiting for server"))
}

fn id(value: &Value, field: &str) -> String {
    value[field]
        .as_str()
        .unwrap_or_else(|| panic!("missing {field} in {value}"))
        .to_string()
}

#[async_std::test]
async fn test_customers() {
    let server = TestServer::start().await;
    let user = testing::user();

    let customer = server.create_customer(&user).await;
    let customer_id = id(&customer, "customer_id");
    assert_eq!(customer["uid"], user.uid.to_string());
    assert_eq!(customer["name"], "Ivan Petrov");

    // Creating again returns the existing profile.
    let reply = server
        .post("/customers", &user, json!({"name": "Someone else"}))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Created);
    assert_eq!(reply.body, customer);
    assert_eq!(reply.cookie("customer_id"), Some(customer_id.as_str()));

    let reply = server
        .get(&format!("/customers/{customer_id}"))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Ok);
    assert_eq!(reply.body, customer);

    let reply = server
        .patch(
            &format!("/customers/{customer_id}"),
            &testing::user(),
            json!({"city": "Tula"}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Forbidden);

    let reply = server
        .patch(
            &format!("/customers/{customer_id}"),
            &user,
            json!({"uid": Uuid::new_v4()}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::BadRequest);

    let reply = server
        .patch(
            &format!("/customers/{customer_id}"),
            &user,
            json!({"city": "Tula", "name": null}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Ok);
    assert_eq!(reply.body["city"], "Tula");
    assert_eq!(reply.body["name"], "Ivan Petrov");
    assert!(!reply.body["updated_at"].is_null());
}

#[async_std::test]
async fn test_mechanics() {
    let server = TestServer::start().await;
    let user = testing::user();

    let reply = server
        .post("/mechanics", &user, json!(testing::mechanic_input()))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Created);
    let mechanic_id = id(&reply.body, "mechanic_id");
    assert_eq!(reply.cookie("mechanic_id"), Some(mechanic_id.as_str()));

    let reply = server
        .patch(
            &format!("/mechanics/{mechanic_id}"),
            &user,
            json!({"private": true, "lat": 55.8}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Ok);
    assert_eq!(reply.body["private"], true);

    let reply = server
        .patch(
            &format!("/mechanics/{mechanic_id}"),
            &user,
            json!({"lat": 100.0}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::BadRequest);
    assert_eq!(reply.body["status_code"], 400);

    let reply = server
        .get(&format!("/mechanics/{mechanic_id}"))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Ok);
    assert_eq!(reply.body["lat"], 55.8);
}

#[async_std::test]
async fn test_autoservices() {
    let server = TestServer::start().await;
    let owner = testing::user();

    let autoservice = server.create_autoservice(&owner).await;
    let autoservice_id = id(&autoservice, "autoservice_id");

    let reply = server
        .patch(
            &format!("/autoservices/{autoservice_id}"),
            &testing::user(),
            json!({"name": "Hijacked"}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Forbidden);

    // Only the name and description can be changed.
    let reply = server
        .patch(
            &format!("/autoservices/{autoservice_id}"),
            &owner,
            json!({"itn": "500100732259"}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::BadRequest);

    let reply = server
        .patch(
            &format!("/autoservices/{autoservice_id}"),
            &owner,
            json!({"name": "Garage 8"}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Ok);
    assert_eq!(reply.body["name"], "Garage 8");
    assert_eq!(reply.body["itn"], autoservice["itn"]);

    let reply = server
        .get(&format!("/autoservices/{autoservice_id}"))
        .await
        .unwrap();
    assert_eq!(reply.body["name"], "Garage 8");
}

#[async_std::test]
async fn test_vehicles() {
    let server = TestServer::start().await;
    let user = testing::user();
    let customer_id = id(&server.create_customer(&user).await, "customer_id");
    let input = |customer_id: &str| {
        let mut input = json!(testing::vehicle_input(Uuid::nil()));
        input["customer_id"] = json!(customer_id);
        input
    };

    let reply = server
        .post("/vehicle", &user, input(&customer_id))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Created, "{:?}", reply.body);
    let vehicle = reply.body;
    assert_eq!(vehicle["vehicle_brand"]["name"], "Lada");
    assert_eq!(vehicle["vehicle_model"]["name"], "Vesta");
    assert_eq!(vehicle["vehicle_brand"].get("popular"), None);

    let reply = server
        .get(&format!("/vehicle/{}", id(&vehicle, "vehicle_id")))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Ok);
    assert_eq!(reply.body, vehicle);

    // Domain failures are conflicts.
    let reply = server
        .post("/vehicle", &user, input(&customer_id))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Conflict);
    let mut mismatched = input(&customer_id);
    mismatched["vin"] = Value::Null;
    mismatched["vehicle_model_id"] = json!(testing::X5);
    let reply = server.post("/vehicle", &user, mismatched).await.unwrap();
    assert_eq!(reply.status, StatusCode::Conflict);
    let mut unknown_customer = input(&Uuid::now_v7().to_string());
    unknown_customer["vin"] = Value::Null;
    let reply = server
        .post("/vehicle", &user, unknown_customer)
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Conflict);

    // Bad input is not.
    let mut bad_plate = input(&customer_id);
    bad_plate["vin"] = Value::Null;
    bad_plate["state_number"] = json!("А000ВС77");
    let reply = server.post("/vehicle", &user, bad_plate).await.unwrap();
    assert_eq!(reply.status, StatusCode::BadRequest);
    // A malformed VIN is reported before the catalogue mismatch.
    let mut bad_vin = input(&customer_id);
    bad_vin["vin"] = json!("bad");
    bad_vin["vehicle_model_id"] = json!(testing::X5);
    let reply = server.post("/vehicle", &user, bad_vin).await.unwrap();
    assert_eq!(reply.status, StatusCode::BadRequest);
}

#[async_std::test]
async fn test_provided_maintenance() {
    let server = TestServer::start().await;
    let user = testing::user();
    let mechanic_id = id(&server.create_mechanic(&user).await, "mechanic_id");
    let autoservice_id = id(&server.create_autoservice(&user).await, "autoservice_id");

    let reply = server
        .post(
            "/maintenance/provided_maintenance",
            &user,
            json!({
                "price": 1234.567,
                "provided_maintenance_type_id": testing::OIL_CHANGE,
                "mechanic_id": mechanic_id,
                "autoservice_id": autoservice_id,
            }),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Created, "{:?}", reply.body);
    let pm = reply.body;
    assert_eq!(pm["price"], 1234.57);
    assert_eq!(pm["provided_maintenance_type"]["name"], "Oil change");
    assert_eq!(pm["mechanic"]["mechanic_id"], mechanic_id);
    assert_eq!(pm["autoservice"]["autoservice_id"], autoservice_id);
    let pm_id = id(&pm, "provided_maintenance_id");

    let reply = server
        .post(
            "/maintenance/provided_maintenance",
            &user,
            json!({"price": 10, "provided_maintenance_type_id": testing::OIL_CHANGE}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::BadRequest);

    let link = json!({"provided_maintenance_id": pm_id, "country_id": testing::RUSSIA});
    let reply = server
        .post("/maintenance/provided_maintenance/countries", &user, link.clone())
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Created);
    assert_eq!(reply.body, link);
    let reply = server
        .post("/maintenance/provided_maintenance/countries", &user, link.clone())
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Conflict);
    let reply = server
        .post(
            "/maintenance/provided_maintenance/countries",
            &testing::user(),
            json!({"provided_maintenance_id": pm_id, "country_id": testing::GERMANY}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Forbidden);

    let link = json!({"provided_maintenance_id": pm_id, "vehicle_brand_id": testing::BMW});
    let reply = server
        .post("/maintenance/provided_maintenance/vehicle_brands", &user, link.clone())
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::Created);
    let reply = server
        .post(
            "/maintenance/provided_maintenance/vehicle_brands",
            &user,
            json!({"provided_maintenance_id": Uuid::now_v7(), "vehicle_brand_id": testing::BMW}),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::NotFound);
}

#[async_std::test]
async fn test_authentication() {
    let user = testing::user();
    let claims = auth::Claims::new(&user, Duration::minutes(5));
    let dir = tempfile::tempdir().unwrap();
    let revoked = dir.path().join("revoked");
    std::fs::write(&revoked, format!("{}\n", claims.jti.clone().unwrap())).unwrap();

    let server = TestServer::start_with(|opt| {
        opt.auth.revoked_tokens = Some(revoked);
    })
    .await;
    let body = json!(testing::customer_input());

    let reply = send(
        server.client.post(server.url("/customers")),
        None,
        Some(&body),
    )
    .await
    .unwrap();
    assert_eq!(reply.status, StatusCode::Unauthorized);
    assert_eq!(reply.body["status_code"], 401);

    let revoked_token = server.auth.encode(&claims).unwrap();
    let reply = send(
        server.client.post(server.url("/customers")),
        Some(&revoked_token),
        Some(&body),
    )
    .await
    .unwrap();
    assert_eq!(reply.status, StatusCode::Unauthorized);
    assert_eq!(reply.body["detail"], "token has been revoked");

    // The token can also come from a cookie.
    let req = server
        .client
        .post(server.url("/customers"))
        .header("Cookie", format!("token={}", server.token(&user)));
    let reply = send(req, None, Some(&body)).await.unwrap();
    assert_eq!(reply.status, StatusCode::Created);
}

#[async_std::test]
async fn test_trace_ids() {
    let server = TestServer::start().await;

    let reply = server
        .get(&format!("/customers/{}", Uuid::now_v7()))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::NotFound);
    let generated = reply.trace_id.unwrap();
    Uuid::parse_str(&generated).unwrap();

    let req = server
        .client
        .get(server.url(&format!("/customers/{}", Uuid::now_v7())))
        .header("X-Trace-Id", "abc-123");
    let reply = send(req, None, None).await.unwrap();
    assert_eq!(reply.trace_id.as_deref(), Some("abc-123"));
}

#[async_std::test]
async fn test_tls() {
    model::init_logging();
    let port = pick_unused_port().unwrap();
    let opt = Options {
        tls: test_certificate(),
        ..options(port)
    };
    spawn(async move {
        opt.serve().await.unwrap();
        tracing::warn!("server exited");
    });

    let mut connected = false;
    for _ in 0..60 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            connected = true;
            break;
        }
        sleep(StdDuration::from_secs(1)).await;
    }
    assert!(connected, "TLS server did not start");

    // The port only speaks TLS.
    let client: Client = surf::Config::default()
        .set_base_url(format!("http://127.0.0.1:{port}").parse().unwrap())
        .set_timeout(Some(StdDuration::from_secs(10)))
        .try_into()
        .unwrap();
    client
        .get(format!("/products/api/v1/customers/{}", Uuid::now_v7()))
        .await
        .unwrap_err();
}

#[async_std::test]
async fn test_tls_misconfigured() {
    model::init_logging();

    let missing = Options {
        tls: TlsOptions {
            tls_cert: Some("no/such/cert.pem".into()),
            tls_key: Some("no/such/key.pem".into()),
        },
        ..options(pick_unused_port().unwrap())
    };
    missing.serve().await.unwrap_err();

    let unpaired = Options {
        tls: TlsOptions {
            tls_key: None,
            ..test_certificate()
        },
        ..options(pick_unused_port().unwrap())
    };
    let err = unpaired.serve().await.unwrap_err();
    assert!(err.to_string().contains("together"), "{err}");
}

/// A request which must fail with a particular status.
struct ErrorCase {
    name: &'static str,
    method: Method,
    path: String,
    authenticated: bool,
    body: Option<Value>,
    status: StatusCode,
}

struct ErrorCaseResult {
    name: &'static str,
    failure: Option<Error>,
}

impl Display for ErrorCaseResult {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}...", self.name)?;
        if let Some(err) = &self.failure {
            writeln!(f, "{}", Color::Red.paint("FAILED"))?;
            write!(f, "{err}")?;
        } else {
            write!(f, "{}", Color::Green.paint("OK"))?;
        }
        Ok(())
    }
}

impl ErrorCase {
    async fn run(self, server: &TestServer) -> ErrorCaseResult {
        ErrorCaseResult {
            name: self.name,
            failure: self.check(server).await.err(),
        }
    }

    async fn check(&self, server: &TestServer) -> Result<(), Error> {
        let req = server.client.request(self.method, server.url(&self.path));
        let token = self.authenticated.then(|| server.token(&testing::user()));
        let reply = send(req, token.as_deref(), self.body.as_ref()).await?;
        if reply.status != self.status {
            return Err(Error::msg(format!(
                "expected status {}, got {}: {}",
                self.status, reply.status, reply.body
            )));
        }
        if reply.body["status_code"] != json!(self.status as u16)
            || !reply.body["detail"].is_string()
        {
            return Err(Error::msg(format!("malformed error body {}", reply.body)));
        }
        Ok(())
    }
}

#[async_std::test]
async fn test_error_responses() -> Result<(), Error> {
    let server = TestServer::start().await;
    let missing = Uuid::now_v7();
    let cases = vec![
        ErrorCase {
            name: "bad customer id",
            method: Method::Get,
            path: "/customers/42".into(),
            authenticated: false,
            body: None,
            status: StatusCode::BadRequest,
        },
        ErrorCase {
            name: "missing customer",
            method: Method::Get,
            path: format!("/customers/{missing}"),
            authenticated: false,
            body: None,
            status: StatusCode::NotFound,
        },
        ErrorCase {
            name: "missing mechanic",
            method: Method::Get,
            path: format!("/mechanics/{missing}"),
            authenticated: false,
            body: None,
            status: StatusCode::NotFound,
        },
        ErrorCase {
            name: "missing autoservice",
            method: Method::Get,
            path: format!("/autoservices/{missing}"),
            authenticated: false,
            body: None,
            status: StatusCode::NotFound,
        },
        ErrorCase {
            name: "missing vehicle",
            method: Method::Get,
            path: format!("/vehicle/{missing}"),
            authenticated: false,
            body: None,
            status: StatusCode::NotFound,
        },
        ErrorCase {
            name: "patch without token",
            method: Method::Patch,
            path: format!("/customers/{missing}"),
            authenticated: false,
            body: Some(json!({})),
            status: StatusCode::Unauthorized,
        },
        ErrorCase {
            name: "patch missing customer",
            method: Method::Patch,
            path: format!("/customers/{missing}"),
            authenticated: true,
            body: Some(json!({})),
            status: StatusCode::NotFound,
        },
        ErrorCase {
            name: "unknown field",
            method: Method::Post,
            path: "/customers".into(),
            authenticated: true,
            body: Some(json!({"name": "Ivan", "customer_id": missing})),
            status: StatusCode::BadRequest,
        },
        ErrorCase {
            name: "invalid name",
            method: Method::Post,
            path: "/customers".into(),
            authenticated: true,
            body: Some(json!({"name": "I"})),
            status: StatusCode::BadRequest,
        },
        ErrorCase {
            name: "invalid psrn",
            method: Method::Post,
            path: "/autoservices".into(),
            authenticated: true,
            body: Some(json!({
                "name": "Garage",
                "itn": "7707083893",
                "psrn": "1",
                "address": "Lenina 7",
            })),
            status: StatusCode::BadRequest,
        },
        ErrorCase {
            name: "unknown maintenance type",
            method: Method::Post,
            path: "/maintenance/provided_maintenance".into(),
            authenticated: true,
            body: Some(json!({"price": 1, "provided_maintenance_type_id": 999})),
            status: StatusCode::NotFound,
        },
        ErrorCase {
            name: "unknown route",
            method: Method::Get,
            path: "/nothing/here".into(),
            authenticated: false,
            body: None,
            status: StatusCode::NotFound,
        },
    ];

    let results = join_all(cases.into_iter().map(|case| case.run(&server))).await;
    for result in &results {
        println!("{result}");
    }
    if results.iter().any(|result| result.failure.is_some()) {
        Err(Error::msg(format!("{}", Color::Red.paint("error cases failed"))))
    } else {
        Ok(())
    }
}
