//! HTTP API of the products catalogue.

use clap::{Parser, ValueEnum};
use model::{db, services::Services, LogFormat};
use std::path::PathBuf;
use std::sync::Arc;
use tide_rustls::TlsListener;

pub mod api;
pub mod auth;
pub mod middleware;

#[cfg(test)]
mod test_runner;

/// The deployment an instance belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    #[default]
    Local,
    Dev,
    Prod,
}

/// Start the products server.
#[derive(Clone, Debug, Parser)]
#[clap(name = "products")]
pub struct Options {
    /// Address on which to listen.
    #[clap(long, env = "PRODUCTS_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port on which to listen.
    #[clap(short, long, env = "PRODUCTS_PORT", default_value = "8443")]
    pub port: u16,

    /// Name of the application, used as the first segment of every route.
    #[clap(long, env = "PRODUCTS_APP_NAME", default_value = "products")]
    pub app_name: String,

    /// Deployment environment.
    ///
    /// Internal error details are only shown to clients in the local environment.
    #[clap(long, env = "PRODUCTS_ENV", value_enum, default_value = "local")]
    pub env: Environment,

    /// Format of log lines. Defaults to pretty in the local environment and JSON elsewhere.
    #[clap(long, env = "PRODUCTS_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    #[clap(flatten)]
    pub tls: TlsOptions,

    #[clap(flatten)]
    pub auth: auth::Options,

    #[clap(flatten)]
    pub db: db::Options,
}

/// TLS options.
///
/// If no certificate is given, the server speaks plain HTTP.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct TlsOptions {
    /// PEM file with the certificate chain to serve.
    #[clap(long, env = "PRODUCTS_TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// PEM file with the private key for the certificate.
    #[clap(long, env = "PRODUCTS_TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,
}

/// State shared by all request handlers.
#[derive(Clone, Debug)]
pub struct State {
    pub services: Services,
    pub auth: Arc<auth::Authenticator>,
    /// Whether to show the details of internal errors to clients.
    pub expose_internal_errors: bool,
}

impl Options {
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or(match self.env {
            Environment::Local => LogFormat::Pretty,
            _ => LogFormat::Json,
        })
    }

    /// The prefix shared by all API routes.
    pub fn api_prefix(&self) -> String {
        format!("/{}/api/v1", self.app_name)
    }

    /// Build the application, without starting it.
    pub async fn app(&self) -> anyhow::Result<tide::Server<State>> {
        let conn = self.db.connect().await?;
        let auth = auth::Authenticator::new(&self.auth).await?;
        let state = State {
            services: Services::new(conn),
            auth: Arc::new(auth),
            expose_internal_errors: self.env == Environment::Local,
        };

        let mut app = tide::with_state(state);
        app.with(middleware::TraceIds)
            .with(middleware::RequestLogger::new(&self.auth))
            .with(middleware::ErrorBody);
        api::register(app.at(&self.api_prefix()));
        Ok(app)
    }

    /// Run the server until it fails.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let app = self.app().await?;
        let addr = format!("{}:{}", self.host, self.port);
        match (&self.tls.tls_cert, &self.tls.tls_key) {
            (Some(cert), Some(key)) => {
                tracing::info!("serving HTTPS on {addr}");
                app.listen(
                    TlsListener::build()
                        .addrs(addr.as_str())
                        .cert(cert)
                        .key(key),
                )
                .await?;
            }
            (None, None) => {
                tracing::warn!("no TLS certificate configured, serving plain HTTP on {addr}");
                app.listen(addr).await?;
            }
            _ => anyhow::bail!("--tls-cert and --tls-key must be given together"),
        }
        Ok(())
    }
}
