use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::algorithms::{resolve, Family};
use crate::base64url;
use crate::claims::{Claims, Header};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, JwtConfig};
use crate::error::{AuthError, AuthResult, JwtError, JwtResult};
use crate::keys::JwtKey;
use crate::signer;
use crate::token;
use crate::validation::{validate_claims, DEFAULT_LEEWAY_SECONDS};

/// Everything the token service needs, built once at startup.
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    pub key: Arc<JwtKey>,
    pub clock: Arc<dyn Clock>,
    pub leeway_seconds: u64,
}

impl TokenServiceConfig {
    pub fn new(key: JwtKey) -> Self {
        Self {
            key: Arc::new(key),
            clock: Arc::new(SystemClock),
            leeway_seconds: DEFAULT_LEEWAY_SECONDS,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }
}

/// When a token should stop being valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expiry {
    At(DateTime<Utc>),
    /// Seconds relative to "now"; may be fractional or negative.
    In(f64),
}

impl Expiry {
    /// The `exp` value for this expiry, rounded to the nearest whole second.
    pub fn resolve(&self, now: i64) -> JwtResult<i64> {
        let exp = match self {
            Expiry::At(instant) => instant.timestamp_millis() as f64 / 1000.0,
            Expiry::In(seconds) => now as f64 + seconds,
        };
        if !exp.is_finite() {
            return Err(JwtError::InvalidClaims("exp"));
        }
        Ok(exp.round() as i64)
    }
}

/// Stateless issuer/verifier around one immutable key.
#[derive(Debug, Clone)]
pub struct TokenService {
    config: TokenServiceConfig,
}

impl TokenService {
    pub fn new(config: TokenServiceConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self, ConfigError> {
        let key = config.signing_key()?;
        Ok(Self::new(
            TokenServiceConfig::new(key).with_leeway(config.leeway_seconds),
        ))
    }

    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    pub fn now(&self) -> i64 {
        self.config.clock.now()
    }

    pub fn create(&self, header: &Header, claims: &Claims) -> JwtResult<String> {
        create(header, claims, &self.config.key)
    }

    pub fn verify(&self, token: &str) -> JwtResult<Claims> {
        verify(token, &self.config.key, self.config.leeway_seconds, self.now())
    }

    /// Mint a token for `subject` valid for `ttl_seconds` from now.
    pub fn issue_token(&self, subject: &str, ttl_seconds: u64) -> JwtResult<String> {
        let now = self.now();
        let exp = Expiry::In(ttl_seconds as f64).resolve(now)?;
        let claims = Claims::new(subject)
            .with_expiry(exp)
            .with_claim("iat", now);
        self.create(&Header::new(self.config.key.algorithm()), &claims)
    }

    /// Resolve an optional bearer token to the subject it was issued for.
    pub fn authenticate(&self, bearer: Option<&str>) -> AuthResult<String> {
        let token = bearer
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingAuthorization)?;

        match self.verify(token) {
            Ok(claims) => Ok(claims.iss),
            Err(err) => {
                debug!(kind = err.kind(), error = %err, "bearer token rejected");
                Err(AuthError::Token(err))
            }
        }
    }
}

/// Sign `claims` under `header.alg` with `key`.
///
/// `none` is refused, and the key is checked against the algorithm before any
/// signing work happens. Claims whose `extra` shadows `iss`, `exp` or `nbf`
/// are refused with `InvalidClaims`.
pub fn create(header: &Header, claims: &Claims, key: &JwtKey) -> JwtResult<String> {
    let spec = resolve(&header.alg)?;
    if spec.family == Family::Unsigned || !spec.accepts(Some(key)) || !key.can_sign() {
        return Err(JwtError::AlgorithmKeyMismatch(header.alg.clone()));
    }
    claims.check_reserved()?;

    let signing_input = token::encode(header, claims)?;
    let signature = signer::sign(&header.alg, key, &signing_input)?;
    Ok(format!("{signing_input}.{}", base64url::encode(signature)))
}

/// Verify `token` against `key` at time `now` and return its claims.
///
/// The algorithm is pinned by the caller's key: a token whose `alg` the key
/// cannot honour is rejected before its signature is looked at.
pub fn verify(token: &str, key: &JwtKey, leeway_seconds: u64, now: i64) -> JwtResult<Claims> {
    let decoded = token::decode(token)?;
    let alg = match decoded.header.get("alg") {
        Some(Value::String(alg)) => alg.as_str(),
        _ => return Err(JwtError::MalformedToken("header is missing alg")),
    };

    let spec = resolve(alg)?;
    if spec.family == Family::Unsigned || !spec.accepts(Some(key)) {
        return Err(JwtError::AlgorithmMismatch(alg.to_owned()));
    }

    if !signer::verify(alg, key, &decoded.signature, decoded.signing_input)? {
        return Err(JwtError::SignatureMismatch);
    }

    validate_claims(&decoded.payload, leeway_seconds, now)?;
    Claims::try_from(decoded.payload)
}
