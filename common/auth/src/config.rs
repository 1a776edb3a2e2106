use std::env;
use std::fmt;

use thiserror::Error;
use tracing::warn;
use zeroize::Zeroizing;

use crate::algorithms::{Algorithm, Family};
use crate::error::JwtError;
use crate::keys::JwtKey;
use crate::validation::DEFAULT_LEEWAY_SECONDS;

pub const SECRET_ENV: &str = "JWT_SECRET_KEY";
pub const ALGORITHM_ENV: &str = "JWT_ALGORITHM";
pub const LEEWAY_ENV: &str = "JWT_LEEWAY_SECONDS";

/// Used when `JWT_SECRET_KEY` is unset. Only suitable for local development.
pub const DEV_FALLBACK_SECRET: &str = "insecure-development-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}'")]
    InvalidValue { var: &'static str, value: String },
    #[error("{var} must name an HMAC algorithm, got '{value}'")]
    NotHmac { var: &'static str, value: String },
    #[error("signing key rejected: {0}")]
    Key(#[from] JwtError),
}

/// Runtime configuration for token signing and verification.
#[derive(Clone)]
pub struct JwtConfig {
    pub algorithm: Algorithm,
    secret: Zeroizing<String>,
    /// Allowable clock skew in seconds when validating exp/nbf.
    pub leeway_seconds: u64,
    pub using_fallback_secret: bool,
}

impl JwtConfig {
    /// HS256 with the default one second leeway.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            secret: Zeroizing::new(secret.into()),
            leeway_seconds: DEFAULT_LEEWAY_SECONDS,
            using_fallback_secret: false,
        }
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; `from_env` uses the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (secret, using_fallback_secret) = match lookup(SECRET_ENV) {
            Some(secret) if !secret.trim().is_empty() => (secret, false),
            _ => {
                warn!(
                    "{SECRET_ENV} is not set; falling back to the built-in development secret. \
                     Tokens issued by this process can be forged by anyone who has read the source."
                );
                (DEV_FALLBACK_SECRET.to_string(), true)
            }
        };

        let algorithm = match lookup(ALGORITHM_ENV) {
            Some(value) => {
                let algorithm = value.trim().parse::<Algorithm>()?;
                if algorithm.spec().family != Family::Hmac {
                    return Err(ConfigError::NotHmac {
                        var: ALGORITHM_ENV,
                        value,
                    });
                }
                algorithm
            }
            None => Algorithm::HS256,
        };

        let leeway_seconds = match lookup(LEEWAY_ENV) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    var: LEEWAY_ENV,
                    value,
                })?,
            None => DEFAULT_LEEWAY_SECONDS,
        };

        Ok(Self {
            algorithm,
            secret: Zeroizing::new(secret),
            leeway_seconds,
            using_fallback_secret,
        })
    }

    pub fn signing_key(&self) -> Result<JwtKey, ConfigError> {
        Ok(JwtKey::hmac(self.algorithm, self.secret.as_bytes())?)
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("secret", &"***redacted***")
            .field("leeway_seconds", &self.leeway_seconds)
            .field("using_fallback_secret", &self.using_fallback_secret)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_flag_fallback_secret() {
        let config = JwtConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.using_fallback_secret);
        assert_eq!(config.algorithm, Algorithm::HS256);
        assert_eq!(config.leeway_seconds, 1);
        assert_eq!(config.signing_key().unwrap().algorithm(), Algorithm::HS256);
    }

    #[test]
    fn blank_secret_counts_as_unset() {
        let config = JwtConfig::from_lookup(lookup(&[(SECRET_ENV, "   ")])).unwrap();
        assert!(config.using_fallback_secret);
    }

    #[test]
    fn explicit_values_are_honoured() {
        let config = JwtConfig::from_lookup(lookup(&[
            (SECRET_ENV, "prod-secret"),
            (ALGORITHM_ENV, "HS512"),
            (LEEWAY_ENV, "5"),
        ]))
        .unwrap();
        assert!(!config.using_fallback_secret);
        assert_eq!(config.algorithm, Algorithm::HS512);
        assert_eq!(config.leeway_seconds, 5);
        assert!(!format!("{config:?}").contains("prod-secret"));
    }

    #[test]
    fn rejects_asymmetric_and_unknown_algorithms() {
        let err = JwtConfig::from_lookup(lookup(&[(ALGORITHM_ENV, "RS256")])).unwrap_err();
        assert!(matches!(err, ConfigError::NotHmac { .. }));
        let err = JwtConfig::from_lookup(lookup(&[(ALGORITHM_ENV, "none")])).unwrap_err();
        assert!(matches!(err, ConfigError::NotHmac { .. }));
        let err = JwtConfig::from_lookup(lookup(&[(ALGORITHM_ENV, "HS1024")])).unwrap_err();
        assert!(matches!(err, ConfigError::Key(JwtError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn rejects_unparseable_leeway() {
        let err = JwtConfig::from_lookup(lookup(&[(LEEWAY_ENV, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: LEEWAY_ENV, .. }));
    }
}
