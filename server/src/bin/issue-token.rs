//! Mint a token accepted by a server sharing the same JWT options.
//!
//! In production, tokens come from the identity provider. This is for local development and manual
//! testing.

use chrono::Duration;
use clap::Parser;
use model::schema::User;
use products_server::auth::{self, Authenticator};
use uuid::Uuid;

#[derive(Clone, Debug, Parser)]
struct Options {
    /// User to issue the token for. A random user is used if not given.
    #[clap(long)]
    uid: Option<Uuid>,

    /// How long the token stays valid, in minutes.
    #[clap(long, default_value = "60")]
    ttl_minutes: i64,

    #[clap(flatten)]
    auth: auth::Options,
}

#[async_std::main]
async fn main() -> anyhow::Result<()> {
    model::init_logging();
    let opt = Options::parse();
    let user = User::new(opt.uid.unwrap_or_else(Uuid::new_v4));
    let auth = Authenticator::new(&opt.auth).await?;
    let token = auth.issue(&user, Duration::minutes(opt.ttl_minutes))?;
    tracing::info!(uid = %user.uid, "issued token");
    println!("{token}");
    Ok(())
}
