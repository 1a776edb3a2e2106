use std::fmt;

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::algorithms::{Algorithm, Curve, Family};
use crate::error::{JwtError, JwtResult};

const MIN_RSA_BITS: usize = 2048;

/// Key handle bound to exactly one algorithm.
///
/// Binding the algorithm at construction is what pins verification: a token
/// is only checked with the algorithm its verifier's key was built for.
#[derive(Clone)]
pub struct JwtKey {
    algorithm: Algorithm,
    material: KeyMaterial,
}

#[derive(Clone)]
pub(crate) enum KeyMaterial {
    Hmac(Zeroizing<Vec<u8>>),
    RsaPrivate(Box<RsaPrivateKey>),
    RsaPublic(RsaPublicKey),
    P256Private(p256::ecdsa::SigningKey),
    P256Public(p256::ecdsa::VerifyingKey),
    P384Private(p384::ecdsa::SigningKey),
    P384Public(p384::ecdsa::VerifyingKey),
}

impl JwtKey {
    /// Shared secret for one of the `HS*` algorithms.
    pub fn hmac(algorithm: Algorithm, secret: impl AsRef<[u8]>) -> JwtResult<Self> {
        expect_family(algorithm, &[Family::Hmac])?;
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(JwtError::InvalidKey("HMAC secret must not be empty".into()));
        }
        Ok(Self {
            algorithm,
            material: KeyMaterial::Hmac(Zeroizing::new(secret.to_vec())),
        })
    }

    pub fn rsa_private(algorithm: Algorithm, key: RsaPrivateKey) -> JwtResult<Self> {
        expect_family(algorithm, &[Family::RsaPkcs1, Family::RsaPss])?;
        check_rsa_size(key.size())?;
        Ok(Self {
            algorithm,
            material: KeyMaterial::RsaPrivate(Box::new(key)),
        })
    }

    pub fn rsa_public(algorithm: Algorithm, key: RsaPublicKey) -> JwtResult<Self> {
        expect_family(algorithm, &[Family::RsaPkcs1, Family::RsaPss])?;
        check_rsa_size(key.size())?;
        Ok(Self {
            algorithm,
            material: KeyMaterial::RsaPublic(key),
        })
    }

    /// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1 (`BEGIN RSA PRIVATE KEY`).
    pub fn rsa_private_pem(algorithm: Algorithm, pem: &str) -> JwtResult<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|err| JwtError::InvalidKey(format!("RSA private key: {err}")))?;
        Self::rsa_private(algorithm, key)
    }

    /// Accepts SPKI (`BEGIN PUBLIC KEY`) or PKCS#1 (`BEGIN RSA PUBLIC KEY`).
    pub fn rsa_public_pem(algorithm: Algorithm, pem: &str) -> JwtResult<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|err| JwtError::InvalidKey(format!("RSA public key: {err}")))?;
        Self::rsa_public(algorithm, key)
    }

    pub fn es256_private(key: p256::ecdsa::SigningKey) -> Self {
        Self {
            algorithm: Algorithm::ES256,
            material: KeyMaterial::P256Private(key),
        }
    }

    pub fn es256_public(key: p256::ecdsa::VerifyingKey) -> Self {
        Self {
            algorithm: Algorithm::ES256,
            material: KeyMaterial::P256Public(key),
        }
    }

    pub fn es384_private(key: p384::ecdsa::SigningKey) -> Self {
        Self {
            algorithm: Algorithm::ES384,
            material: KeyMaterial::P384Private(key),
        }
    }

    pub fn es384_public(key: p384::ecdsa::VerifyingKey) -> Self {
        Self {
            algorithm: Algorithm::ES384,
            material: KeyMaterial::P384Public(key),
        }
    }

    /// PKCS#8 EC private key; the curve is taken from `algorithm`.
    pub fn ec_private_pem(algorithm: Algorithm, pem: &str) -> JwtResult<Self> {
        match algorithm.spec().curve {
            Some(Curve::P256) => p256::ecdsa::SigningKey::from_pkcs8_pem(pem)
                .map(Self::es256_private)
                .map_err(|err| JwtError::InvalidKey(format!("P-256 private key: {err}"))),
            Some(Curve::P384) => p384::ecdsa::SigningKey::from_pkcs8_pem(pem)
                .map(Self::es384_private)
                .map_err(|err| JwtError::InvalidKey(format!("P-384 private key: {err}"))),
            None => Err(JwtError::AlgorithmKeyMismatch(algorithm.to_string())),
        }
    }

    /// SPKI EC public key; the curve is taken from `algorithm`.
    pub fn ec_public_pem(algorithm: Algorithm, pem: &str) -> JwtResult<Self> {
        match algorithm.spec().curve {
            Some(Curve::P256) => p256::ecdsa::VerifyingKey::from_public_key_pem(pem)
                .map(Self::es256_public)
                .map_err(|err| JwtError::InvalidKey(format!("P-256 public key: {err}"))),
            Some(Curve::P384) => p384::ecdsa::VerifyingKey::from_public_key_pem(pem)
                .map(Self::es384_public)
                .map_err(|err| JwtError::InvalidKey(format!("P-384 public key: {err}"))),
            None => Err(JwtError::AlgorithmKeyMismatch(algorithm.to_string())),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Public-only handles can verify but never sign.
    pub fn can_sign(&self) -> bool {
        matches!(
            self.material,
            KeyMaterial::Hmac(_)
                | KeyMaterial::RsaPrivate(_)
                | KeyMaterial::P256Private(_)
                | KeyMaterial::P384Private(_)
        )
    }

    pub(crate) fn material(&self) -> &KeyMaterial {
        &self.material
    }
}

impl fmt::Debug for JwtKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKey")
            .field("algorithm", &self.algorithm)
            .field("material", &"***redacted***")
            .finish()
    }
}

fn expect_family(algorithm: Algorithm, allowed: &[Family]) -> JwtResult<()> {
    if allowed.contains(&algorithm.spec().family) {
        Ok(())
    } else {
        Err(JwtError::AlgorithmKeyMismatch(algorithm.to_string()))
    }
}

fn check_rsa_size(modulus_bytes: usize) -> JwtResult<()> {
    let bits = modulus_bytes * 8;
    if bits < MIN_RSA_BITS {
        return Err(JwtError::InvalidKey(format!(
            "RSA modulus of {bits} bits is below the {MIN_RSA_BITS} bit minimum"
        )));
    }
    Ok(())
}
