use serde_json::{Map, Value};

use crate::error::{JwtError, JwtResult};

/// Clock skew tolerated between issuer and verifier.
pub const DEFAULT_LEEWAY_SECONDS: u64 = 1;

/// Enforce `exp` and `nbf` against `now` (Unix seconds).
///
/// A present but non-numeric `exp` or `nbf` (including `null`) is an error,
/// never silently ignored.
pub fn validate_claims(payload: &Map<String, Value>, leeway_seconds: u64, now: i64) -> JwtResult<()> {
    let exp = numeric_claim(payload, "exp")?;
    let nbf = numeric_claim(payload, "nbf")?;
    let now = now as f64;
    let leeway = leeway_seconds as f64;

    if let Some(exp) = exp {
        if now > exp + leeway {
            return Err(JwtError::TokenExpired);
        }
    }

    if let Some(nbf) = nbf {
        if now < nbf - leeway {
            return Err(JwtError::TokenNotYetValid);
        }
    }

    Ok(())
}

fn numeric_claim(payload: &Map<String, Value>, name: &'static str) -> JwtResult<Option<f64>> {
    match payload.get(name) {
        None => Ok(None),
        Some(Value::Number(number)) => number
            .as_f64()
            .map(Some)
            .ok_or(JwtError::InvalidClaims(name)),
        Some(_) => Err(JwtError::InvalidClaims(name)),
    }
}
