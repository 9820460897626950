//! Middleware applied to every request.

use crate::{auth, State};
use async_trait::async_trait;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tide::{http::cookies::Cookie, Body, Middleware, Next, Request};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the trace ID of a request.
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Replaces the values of sensitive headers and cookies in logs.
const OBFUSCATED: &str = "*****";

/// Identifies a request in logs, and across services which forward it.
#[derive(Clone, Debug, PartialEq, Eq, Display, From)]
pub struct TraceId(String);

/// Assigns each request a [`TraceId`].
///
/// A trace ID sent by the client is kept, otherwise a new one is generated. The ID is attached to
/// the request, echoed in the response, and recorded on a span covering all logs emitted while
/// handling the request.
#[derive(Clone, Copy, Debug)]
pub struct TraceIds;

#[async_trait]
impl<S: Clone + Send + Sync + 'static> Middleware<S> for TraceIds {
    async fn handle(&self, mut req: Request<S>, next: Next<'_, S>) -> tide::Result {
        let id = req
            .header(TRACE_ID_HEADER)
            .map(|value| value.last().as_str().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        req.set_ext(TraceId::from(id.clone()));
        let span = tracing::info_span!("request", trace_id = %id);
        let mut res = next.run(req).instrument(span).await;
        res.insert_header(TRACE_ID_HEADER, id.as_str());
        Ok(res)
    }
}

/// Logs every request with its outcome.
#[derive(Clone, Debug)]
pub struct RequestLogger {
    /// Lower-case names of headers whose values are not logged.
    sensitive_headers: Vec<String>,
    sensitive_cookies: Vec<String>,
}

impl RequestLogger {
    pub fn new(opt: &auth::Options) -> Self {
        let mut sensitive_headers = vec![
            "authorization".to_string(),
            "cookie".to_string(),
            opt.jwt_header.to_lowercase(),
        ];
        sensitive_headers.dedup();
        Self {
            sensitive_headers,
            sensitive_cookies: vec![opt.jwt_cookie.clone()],
        }
    }

    fn headers<'a>(
        &self,
        headers: impl IntoIterator<Item = (&'a str, String)>,
    ) -> BTreeMap<String, String> {
        headers
            .into_iter()
            .map(|(name, value)| {
                let name = name.to_lowercase();
                if self.sensitive_headers.contains(&name) {
                    (name, OBFUSCATED.to_string())
                } else {
                    (name, value)
                }
            })
            .collect()
    }

    fn cookies(&self, header: &str) -> BTreeMap<String, String> {
        header
            .split(';')
            .filter_map(|pair| Cookie::parse(pair.trim()).ok())
            .map(|cookie| {
                let name = cookie.name().to_string();
                if self.sensitive_cookies.contains(&name) {
                    (name, OBFUSCATED.to_string())
                } else {
                    (name, cookie.value().to_string())
                }
            })
            .collect()
    }
}

#[async_trait]
impl<S: Clone + Send + Sync + 'static> Middleware<S> for RequestLogger {
    async fn handle(&self, req: Request<S>, next: Next<'_, S>) -> tide::Result {
        let start = Instant::now();
        let method = req.method();
        let path = req.url().path().to_string();
        let headers = self.headers(req.iter().map(|(name, values)| {
            let value = values
                .iter()
                .map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str(), value)
        }));
        let cookies = req
            .header("Cookie")
            .map(|values| self.cookies(values.last().as_str()))
            .unwrap_or_default();

        let res = next.run(req).await;

        let status = res.status() as u16;
        let latency_ms = start.elapsed().as_millis() as u64;
        if status >= 500 {
            tracing::error!(%method, %path, status, latency_ms, ?headers, ?cookies, "request failed");
        } else {
            tracing::info!(%method, %path, status, latency_ms, ?headers, ?cookies, "request handled");
        }
        Ok(res)
    }
}

/// The body of every error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status_code: u16,
    pub detail: String,
}

/// Renders errors as an [`ErrorResponse`].
///
/// The details of internal errors are replaced by a generic message unless the server is
/// configured to expose them.
#[derive(Clone, Copy, Debug)]
pub struct ErrorBody;

#[async_trait]
impl Middleware<State> for ErrorBody {
    async fn handle(&self, req: Request<State>, next: Next<'_, State>) -> tide::Result {
        let expose = req.state().expose_internal_errors;
        let mut res = next.run(req).await;
        let status = res.status();
        let detail = match res.take_error() {
            Some(err) if status.is_server_error() => {
                tracing::error!("internal error: {err}");
                if expose {
                    err.to_string()
                } else {
                    status.canonical_reason().to_string()
                }
            }
            Some(err) => err.to_string(),
            None if (status.is_client_error() || status.is_server_error())
                && res.is_empty().unwrap_or(true) =>
            {
                status.canonical_reason().to_string()
            }
            None => return Ok(res),
        };
        res.set_body(Body::from_json(&ErrorResponse {
            status_code: status as u16,
            detail,
        })?);
        Ok(res)
    }
}
