use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::algorithms::Algorithm;
use crate::error::{JwtError, JwtResult};

/// JOSE header. Unknown fields survive a decode/encode cycle via `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Header {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            alg: algorithm.to_string(),
            typ: Some("JWT".to_string()),
            extra: Map::new(),
        }
    }
}

const RESERVED: [&str; 3] = ["iss", "exp", "nbf"];

/// Claims set of an issued or verified token.
///
/// `iss` carries the authenticated username. Claims other than `iss`, `exp`
/// and `nbf` are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            iss: issuer.into(),
            exp: None,
            nbf: None,
            extra: Map::new(),
        }
    }

    pub fn with_expiry(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    pub fn with_not_before(mut self, nbf: i64) -> Self {
        self.nbf = Some(nbf);
        self
    }

    /// Adds a claim. `iss`, `exp` and `nbf` land in their typed fields when
    /// the value has the right shape; an ill-typed reserved claim is kept in
    /// `extra` and rejected by `create` as `InvalidClaims`.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match (name.as_str(), &value) {
            ("iss", Value::String(iss)) => self.iss = iss.clone(),
            ("exp", Value::Number(number)) if number.is_i64() => self.exp = number.as_i64(),
            ("nbf", Value::Number(number)) if number.is_i64() => self.nbf = number.as_i64(),
            _ => {
                self.extra.insert(name, value);
            }
        }
        self
    }

    /// `extra` must not shadow a typed field, or the payload would carry the
    /// same member twice.
    pub fn check_reserved(&self) -> JwtResult<()> {
        match RESERVED.iter().find(|name| self.extra.contains_key(**name)) {
            Some(name) => Err(JwtError::InvalidClaims(*name)),
            None => Ok(()),
        }
    }

    pub fn subject(&self) -> &str {
        &self.iss
    }
}

impl TryFrom<Map<String, Value>> for Claims {
    type Error = JwtError;

    fn try_from(mut payload: Map<String, Value>) -> JwtResult<Self> {
        let iss = match payload.remove("iss") {
            Some(Value::String(iss)) => iss,
            _ => return Err(JwtError::InvalidClaims("iss")),
        };
        let exp = integral_claim(payload.remove("exp"), "exp")?;
        let nbf = integral_claim(payload.remove("nbf"), "nbf")?;

        Ok(Self {
            iss,
            exp,
            nbf,
            extra: payload,
        })
    }
}

fn integral_claim(value: Option<Value>, name: &'static str) -> JwtResult<Option<i64>> {
    match value {
        None => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .map(Some)
            .ok_or(JwtError::InvalidClaims(name)),
        Some(_) => Err(JwtError::InvalidClaims(name)),
    }
}
