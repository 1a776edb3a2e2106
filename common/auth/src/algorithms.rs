//! Registry of the JWS algorithms this crate understands.
//!
//! Supported: `HS256`, `HS384`, `HS512`, `RS256`, `RS384`, `RS512`, `PS256`,
//! `PS384`, `PS512`, `ES256`, `ES384` and `none`. `ES512` is not supported.
//! `none` resolves so callers can recognise it, but the token service refuses
//! it in both directions.

use std::fmt;
use std::str::FromStr;

use crate::error::{JwtError, JwtResult};
use crate::keys::JwtKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    PS256,
    PS384,
    PS512,
    ES256,
    ES384,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Hmac,
    RsaPkcs1,
    RsaPss,
    Ecdsa,
    Unsigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlg {
    Sha256,
    Sha384,
    Sha512,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    P256,
    P384,
}

/// Concrete signing parameters behind a symbolic algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmSpec {
    pub algorithm: Algorithm,
    pub family: Family,
    pub hash: Option<HashAlg>,
    pub curve: Option<Curve>,
}

impl Algorithm {
    pub const ALL: [Algorithm; 12] = [
        Algorithm::HS256,
        Algorithm::HS384,
        Algorithm::HS512,
        Algorithm::RS256,
        Algorithm::RS384,
        Algorithm::RS512,
        Algorithm::PS256,
        Algorithm::PS384,
        Algorithm::PS512,
        Algorithm::ES256,
        Algorithm::ES384,
        Algorithm::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            Algorithm::HS512 => "HS512",
            Algorithm::RS256 => "RS256",
            Algorithm::RS384 => "RS384",
            Algorithm::RS512 => "RS512",
            Algorithm::PS256 => "PS256",
            Algorithm::PS384 => "PS384",
            Algorithm::PS512 => "PS512",
            Algorithm::ES256 => "ES256",
            Algorithm::ES384 => "ES384",
            Algorithm::None => "none",
        }
    }

    pub fn spec(self) -> AlgorithmSpec {
        let (family, hash, curve) = match self {
            Algorithm::HS256 => (Family::Hmac, Some(HashAlg::Sha256), None),
            Algorithm::HS384 => (Family::Hmac, Some(HashAlg::Sha384), None),
            Algorithm::HS512 => (Family::Hmac, Some(HashAlg::Sha512), None),
            Algorithm::RS256 => (Family::RsaPkcs1, Some(HashAlg::Sha256), None),
            Algorithm::RS384 => (Family::RsaPkcs1, Some(HashAlg::Sha384), None),
            Algorithm::RS512 => (Family::RsaPkcs1, Some(HashAlg::Sha512), None),
            Algorithm::PS256 => (Family::RsaPss, Some(HashAlg::Sha256), None),
            Algorithm::PS384 => (Family::RsaPss, Some(HashAlg::Sha384), None),
            Algorithm::PS512 => (Family::RsaPss, Some(HashAlg::Sha512), None),
            Algorithm::ES256 => (Family::Ecdsa, Some(HashAlg::Sha256), Some(Curve::P256)),
            Algorithm::ES384 => (Family::Ecdsa, Some(HashAlg::Sha384), Some(Curve::P384)),
            Algorithm::None => (Family::Unsigned, None, None),
        };

        AlgorithmSpec {
            algorithm: self,
            family,
            hash,
            curve,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = JwtError;

    fn from_str(value: &str) -> JwtResult<Self> {
        Algorithm::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| JwtError::UnsupportedAlgorithm(value.to_owned()))
    }
}

impl AlgorithmSpec {
    /// True when `key` may sign or verify under this algorithm. `none` only
    /// accepts the absence of a key.
    pub fn accepts(&self, key: Option<&JwtKey>) -> bool {
        match (self.family, key) {
            (Family::Unsigned, None) => true,
            (Family::Unsigned, Some(_)) | (_, None) => false,
            (family, Some(key)) => {
                let bound = key.algorithm().spec();
                bound.family == family && bound.hash == self.hash && bound.curve == self.curve
            }
        }
    }
}

/// Resolve a symbolic identifier such as `"HS256"`. Matching is case sensitive.
pub fn resolve(id: &str) -> JwtResult<AlgorithmSpec> {
    id.parse::<Algorithm>().map(Algorithm::spec)
}

/// Unknown identifiers are never compatible with anything.
pub fn is_compatible(id: &str, key: Option<&JwtKey>) -> bool {
    resolve(id).map(|spec| spec.accepts(key)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_round_trips_every_identifier() {
        for algorithm in Algorithm::ALL {
            let spec = resolve(algorithm.as_str()).expect("known identifier");
            assert_eq!(spec.algorithm, algorithm);
        }
    }

    #[test]
    fn resolve_rejects_unknown_and_wrong_case() {
        assert_eq!(
            resolve("ES512"),
            Err(JwtError::UnsupportedAlgorithm("ES512".into()))
        );
        assert!(resolve("hs256").is_err());
        assert!(resolve("NONE").is_err());
        assert!(resolve("").is_err());
    }

    #[test]
    fn ecdsa_specs_carry_curve() {
        assert_eq!(Algorithm::ES256.spec().curve, Some(Curve::P256));
        assert_eq!(Algorithm::ES384.spec().curve, Some(Curve::P384));
        assert_eq!(Algorithm::RS256.spec().curve, None);
    }

    #[test]
    fn specs_without_curve_have_no_curve() {
        for algorithm in Algorithm::ALL {
            let spec = algorithm.spec();
            assert_eq!(spec.curve.is_some(), spec.family == Family::Ecdsa, "{algorithm}");
            assert_eq!(spec.hash.is_none(), algorithm == Algorithm::None, "{algorithm}");
        }
        assert_eq!(Algorithm::HS384.spec().hash, Some(HashAlg::Sha384));
        assert_eq!(Algorithm::PS512.spec().family, Family::RsaPss);
    }

    #[test]
    fn hmac_key_compatibility_pins_hash() {
        let key = JwtKey::hmac(Algorithm::HS256, b"secret").unwrap();
        assert!(is_compatible("HS256", Some(&key)));
        assert!(!is_compatible("HS384", Some(&key)));
        assert!(!is_compatible("HS512", Some(&key)));
        assert!(!is_compatible("RS256", Some(&key)));
        assert!(!is_compatible("unknown", Some(&key)));
    }

    #[test]
    fn none_only_matches_missing_key() {
        let key = JwtKey::hmac(Algorithm::HS256, b"secret").unwrap();
        assert!(is_compatible("none", None));
        assert!(!is_compatible("none", Some(&key)));
        assert!(!is_compatible("HS256", None));
    }
}
