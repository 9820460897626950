//! Authentication with HMAC-signed JSON web tokens.
//!
//! Users are authenticated by an external identity provider, which hands out tokens signed with a
//! secret shared with this service. A token names the user in its `sub` claim and must carry an
//! expiry (`exp`) and a unique token ID (`jti`), which can be used to revoke it before it expires.

use crate::State;
use async_std::{fs, sync::RwLock};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use clap::Args;
use hmac::{digest::KeyInit, Hmac, Mac};
use model::schema::User;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use snafu::Snafu;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};
use tide::{http::StatusCode, Middleware, Next, Request};
use uuid::Uuid;

/// Authentication options.
#[derive(Clone, Debug, Args)]
#[group(skip)]
pub struct Options {
    /// Secret used to sign and verify tokens.
    #[clap(long, env = "PRODUCTS_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Signature algorithm tokens must use.
    #[clap(long, env = "PRODUCTS_JWT_ALGORITHM", default_value = "HS256")]
    pub jwt_algorithm: Algorithm,

    /// Header carrying the token.
    #[clap(long, env = "PRODUCTS_JWT_HEADER", default_value = "Authorization")]
    pub jwt_header: String,

    /// Cookie carrying the token, if the header is absent.
    #[clap(long, env = "PRODUCTS_JWT_COOKIE", default_value = "token")]
    pub jwt_cookie: String,

    /// File listing the IDs (`jti`) of revoked tokens, one per line.
    #[clap(long, env = "PRODUCTS_REVOKED_TOKENS")]
    pub revoked_tokens: Option<PathBuf>,
}

impl Options {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_algorithm: Algorithm::HS256,
            jwt_header: "Authorization".into(),
            jwt_cookie: "token".into(),
            revoked_tokens: None,
        }
    }
}

/// Supported signature algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[allow(clippy::upper_case_acronyms)]
pub enum Algorithm {
    HS256,
    HS384,
    HS512,
}

impl Algorithm {
    fn sign(&self, secret: &[u8], msg: &[u8]) -> Option<Vec<u8>> {
        match self {
            Self::HS256 => sign_with::<Hmac<Sha256>>(secret, msg),
            Self::HS384 => sign_with::<Hmac<Sha384>>(secret, msg),
            Self::HS512 => sign_with::<Hmac<Sha512>>(secret, msg),
        }
    }

    fn verify(&self, secret: &[u8], msg: &[u8], sig: &[u8]) -> bool {
        match self {
            Self::HS256 => verify_with::<Hmac<Sha256>>(secret, msg, sig),
            Self::HS384 => verify_with::<Hmac<Sha384>>(secret, msg, sig),
            Self::HS512 => verify_with::<Hmac<Sha512>>(secret, msg, sig),
        }
    }
}

fn sign_with<M: Mac + KeyInit>(secret: &[u8], msg: &[u8]) -> Option<Vec<u8>> {
    let mut mac = <M as KeyInit>::new_from_slice(secret).ok()?;
    mac.update(msg);
    Some(mac.finalize().into_bytes().to_vec())
}

fn verify_with<M: Mac + KeyInit>(secret: &[u8], msg: &[u8], sig: &[u8]) -> bool {
    match <M as KeyInit>::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(msg);
            mac.verify_slice(sig).is_ok()
        }
        Err(_) => false,
    }
}

/// Reasons a request fails authentication.
#[derive(Clone, Debug, PartialEq, Eq, Snafu)]
pub enum AuthError {
    #[snafu(display("missing authentication token"))]
    Missing,
    #[snafu(display("malformed token: {reason}"))]
    Malformed { reason: String },
    #[snafu(display("token signed with unsupported algorithm {alg}"))]
    WrongAlgorithm { alg: String },
    #[snafu(display("invalid token signature"))]
    BadSignature,
    #[snafu(display("token has no expiry"))]
    MissingExpiry,
    #[snafu(display("token has expired"))]
    Expired,
    #[snafu(display("token is not valid yet"))]
    NotYetValid,
    #[snafu(display("token was issued in the future"))]
    IssuedInFuture,
    #[snafu(display("token does not identify a user"))]
    InvalidSubject,
    #[snafu(display("token has been revoked"))]
    Revoked,
}

impl AuthError {
    fn malformed(reason: impl ToString) -> Self {
        Self::Malformed {
            reason: reason.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// The claims of a token which this service looks at. Any other claims are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiry, in seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issue time, in seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Start of validity, in seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Claims for a token identifying `user`, valid for `ttl`.
    pub fn new(user: &User, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: Some(user.uid.to_string()),
            exp: Some((now + ttl).timestamp()),
            iat: Some(now.timestamp()),
            nbf: None,
            jti: Some(Uuid::new_v4().to_string()),
        }
    }
}

/// IDs of tokens which are no longer accepted, even though they have not expired.
#[derive(Debug, Default)]
pub struct RevocationList {
    revoked: RwLock<HashSet<String>>,
}

impl RevocationList {
    /// Load a revocation list from a file with one token ID per line.
    ///
    /// Blank lines and lines starting with `#` are ignored.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).await?;
        let revoked = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect::<HashSet<_>>();
        tracing::info!(
            "loaded {} revoked tokens from {}",
            revoked.len(),
            path.as_ref().display()
        );
        Ok(Self {
            revoked: RwLock::new(revoked),
        })
    }

    pub async fn revoke(&self, jti: impl Into<String>) {
        self.revoked.write().await.insert(jti.into());
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.read().await.contains(jti)
    }
}

/// Issues and checks tokens.
#[derive(Debug)]
pub struct Authenticator {
    algorithm: Algorithm,
    secret: Vec<u8>,
    header: String,
    cookie: String,
    revoked: RevocationList,
}

impl Authenticator {
    pub async fn new(opt: &Options) -> anyhow::Result<Self> {
        if opt.jwt_secret.is_empty() {
            anyhow::bail!("JWT secret must not be empty");
        }
        let revoked = match &opt.revoked_tokens {
            Some(path) => RevocationList::load(path).await?,
            None => RevocationList::default(),
        };
        Ok(Self {
            algorithm: opt.jwt_algorithm,
            secret: opt.jwt_secret.as_bytes().to_vec(),
            header: opt.jwt_header.clone(),
            cookie: opt.jwt_cookie.clone(),
            revoked,
        })
    }

    pub fn revocation_list(&self) -> &RevocationList {
        &self.revoked
    }

    /// Sign `claims` into a token.
    pub fn encode(&self, claims: &Claims) -> anyhow::Result<String> {
        let header = Header {
            alg: self.algorithm.to_string(),
            typ: Some("JWT".into()),
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
        );
        let sig = self
            .algorithm
            .sign(&self.secret, signing_input.as_bytes())
            .ok_or_else(|| anyhow::anyhow!("invalid {} key", self.algorithm))?;
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(sig)))
    }

    /// A token identifying `user`, valid for `ttl`.
    pub fn issue(&self, user: &User, ttl: Duration) -> anyhow::Result<String> {
        self.encode(&Claims::new(user, ttl))
    }

    /// Check the signature and expiry of a token and extract its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        let (signing_input, sig) = token
            .rsplit_once('.')
            .ok_or_else(|| AuthError::malformed("expected 3 segments"))?;
        let (header, payload) = signing_input
            .split_once('.')
            .filter(|(_, payload)| !payload.contains('.'))
            .ok_or_else(|| AuthError::malformed("expected 3 segments"))?;

        let header: Header = decode_segment(header)?;
        if header.alg != self.algorithm.to_string() {
            return Err(AuthError::WrongAlgorithm { alg: header.alg });
        }
        let sig = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(AuthError::malformed)?;
        if !self
            .algorithm
            .verify(&self.secret, signing_input.as_bytes(), &sig)
        {
            return Err(AuthError::BadSignature);
        }

        let claims: Claims = decode_segment(payload)?;
        let now = Utc::now().timestamp();
        match claims.exp {
            None => return Err(AuthError::MissingExpiry),
            Some(exp) if exp <= now => return Err(AuthError::Expired),
            _ => {}
        }
        if claims.nbf.map_or(false, |nbf| nbf > now) {
            return Err(AuthError::NotYetValid);
        }
        if claims.iat.map_or(false, |iat| iat > now) {
            return Err(AuthError::IssuedInFuture);
        }
        Ok(claims)
    }

    /// Authenticate the user presenting `token`.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.decode(token)?;
        let uid = claims
            .sub
            .as_deref()
            .and_then(|sub| Uuid::parse_str(sub).ok())
            .ok_or(AuthError::InvalidSubject)?;
        // A token without an ID could never be revoked, so it is not accepted at all.
        match claims.jti.as_deref() {
            Some(jti) if !self.revoked.is_revoked(jti).await => Ok(User::new(uid)),
            _ => Err(AuthError::Revoked),
        }
    }

    /// The token presented with a request, from the token header or else the token cookie.
    pub fn token<S>(&self, req: &Request<S>) -> Option<String> {
        if let Some(value) = req.header(self.header.as_str()) {
            return Some(value.last().as_str().to_string());
        }
        req.cookie(&self.cookie)
            .map(|cookie| cookie.value().to_string())
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(AuthError::malformed)?;
    serde_json::from_slice(&bytes).map_err(AuthError::malformed)
}

/// Middleware rejecting requests without a valid token with `401 Unauthorized`.
///
/// The authenticated [`User`] is attached to accepted requests, where handlers can find it with
/// [`Request::ext`].
#[derive(Clone, Copy, Debug)]
pub struct RequireUser;

#[async_trait]
impl Middleware<State> for RequireUser {
    async fn handle(&self, mut req: Request<State>, next: Next<'_, State>) -> tide::Result {
        let auth = req.state().auth.clone();
        let res = match auth.token(&req) {
            Some(token) => auth.authenticate(&token).await,
            None => Err(AuthError::Missing),
        };
        match res {
            Ok(user) => {
                tracing::debug!(uid = %user.uid, "authenticated");
                req.set_ext(user);
                Ok(next.run(req).await)
            }
            Err(err) => {
                tracing::warn!("authentication failed: {err}");
                Err(tide::Error::from_str(StatusCode::Unauthorized, err))
            }
        }
    }
}
