use hmac::{Hmac, Mac};
use rsa::rand_core::OsRng;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use rsa::{pkcs1v15, pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use crate::algorithms::{resolve, AlgorithmSpec, Family, HashAlg};
use crate::error::{JwtError, JwtResult};
use crate::keys::{JwtKey, KeyMaterial};

macro_rules! hmac_tag {
    ($digest:ty, $secret:expr, $input:expr) => {{
        let mut mac = <Hmac<$digest> as Mac>::new_from_slice($secret)
            .map_err(|_| JwtError::InvalidKey("HMAC secret rejected".into()))?;
        mac.update($input);
        mac.finalize().into_bytes().to_vec()
    }};
}

macro_rules! rsa_sign {
    ($scheme:ident, $digest:ty, $key:expr, $input:expr) => {
        $scheme::SigningKey::<$digest>::new($key.clone())
            .try_sign($input)
            .map(|signature| signature.to_vec())
    };
}

macro_rules! pss_sign {
    ($digest:ty, $key:expr, $input:expr) => {
        pss::BlindedSigningKey::<$digest>::new($key.clone())
            .try_sign_with_rng(&mut OsRng, $input)
            .map(|signature| signature.to_vec())
    };
}

macro_rules! rsa_verify {
    ($scheme:ident, $digest:ty, $key:expr, $signature:expr, $input:expr) => {
        match $scheme::Signature::try_from($signature) {
            Ok(signature) => $scheme::VerifyingKey::<$digest>::new($key.clone())
                .verify($input, &signature)
                .is_ok(),
            Err(_) => false,
        }
    };
}

/// Sign `signing_input` with `key` under the algorithm named by `algorithm`.
///
/// The key must be compatible with the algorithm and hold private material.
pub fn sign(algorithm: &str, key: &JwtKey, signing_input: &str) -> JwtResult<Vec<u8>> {
    let spec = compatible_spec(algorithm, key)?;
    let input = signing_input.as_bytes();
    let hash = required_hash(&spec, algorithm)?;

    match (spec.family, key.material()) {
        (Family::Hmac, KeyMaterial::Hmac(secret)) => hmac_digest(hash, secret, input),
        (Family::RsaPkcs1, KeyMaterial::RsaPrivate(private)) => {
            pkcs1_sign(hash, private, input)
        }
        (Family::RsaPss, KeyMaterial::RsaPrivate(private)) => pss_sign(hash, private, input),
        (Family::Ecdsa, KeyMaterial::P256Private(private)) => {
            use p256::ecdsa::signature::Signer as _;
            let signature: p256::ecdsa::Signature = private
                .try_sign(input)
                .map_err(|err| JwtError::InvalidKey(err.to_string()))?;
            Ok(signature.to_bytes().to_vec())
        }
        (Family::Ecdsa, KeyMaterial::P384Private(private)) => {
            use p384::ecdsa::signature::Signer as _;
            let signature: p384::ecdsa::Signature = private
                .try_sign(input)
                .map_err(|err| JwtError::InvalidKey(err.to_string()))?;
            Ok(signature.to_bytes().to_vec())
        }
        _ => Err(JwtError::AlgorithmKeyMismatch(algorithm.to_owned())),
    }
}

/// Check `signature` over `signing_input`. MAC comparison is constant time.
///
/// Returns `Ok(false)` for a wrong or unparseable signature and an error only
/// when the key cannot be used with the algorithm at all.
pub fn verify(
    algorithm: &str,
    key: &JwtKey,
    signature: &[u8],
    signing_input: &str,
) -> JwtResult<bool> {
    let spec = compatible_spec(algorithm, key)?;
    let input = signing_input.as_bytes();
    let hash = required_hash(&spec, algorithm)?;

    let valid = match (spec.family, key.material()) {
        (Family::Hmac, KeyMaterial::Hmac(secret)) => {
            let expected = hmac_digest(hash, secret, input)?;
            bool::from(expected.as_slice().ct_eq(signature))
        }
        (Family::RsaPkcs1, KeyMaterial::RsaPrivate(private)) => {
            pkcs1_verify(hash, &private.to_public_key(), signature, input)
        }
        (Family::RsaPkcs1, KeyMaterial::RsaPublic(public)) => {
            pkcs1_verify(hash, public, signature, input)
        }
        (Family::RsaPss, KeyMaterial::RsaPrivate(private)) => {
            pss_verify(hash, &private.to_public_key(), signature, input)
        }
        (Family::RsaPss, KeyMaterial::RsaPublic(public)) => {
            pss_verify(hash, public, signature, input)
        }
        (Family::Ecdsa, KeyMaterial::P256Private(private)) => {
            p256_verify(private.verifying_key(), signature, input)
        }
        (Family::Ecdsa, KeyMaterial::P256Public(public)) => p256_verify(public, signature, input),
        (Family::Ecdsa, KeyMaterial::P384Private(private)) => {
            p384_verify(private.verifying_key(), signature, input)
        }
        (Family::Ecdsa, KeyMaterial::P384Public(public)) => p384_verify(public, signature, input),
        _ => return Err(JwtError::AlgorithmKeyMismatch(algorithm.to_owned())),
    };

    Ok(valid)
}

fn compatible_spec(algorithm: &str, key: &JwtKey) -> JwtResult<AlgorithmSpec> {
    let spec = resolve(algorithm)?;
    if !spec.accepts(Some(key)) {
        return Err(JwtError::AlgorithmKeyMismatch(algorithm.to_owned()));
    }
    Ok(spec)
}

fn required_hash(spec: &AlgorithmSpec, algorithm: &str) -> JwtResult<HashAlg> {
    spec.hash
        .ok_or_else(|| JwtError::AlgorithmKeyMismatch(algorithm.to_owned()))
}

fn hmac_digest(hash: HashAlg, secret: &[u8], input: &[u8]) -> JwtResult<Vec<u8>> {
    let tag = match hash {
        HashAlg::Sha256 => hmac_tag!(Sha256, secret, input),
        HashAlg::Sha384 => hmac_tag!(Sha384, secret, input),
        HashAlg::Sha512 => hmac_tag!(Sha512, secret, input),
    };
    Ok(tag)
}

fn pkcs1_sign(hash: HashAlg, key: &RsaPrivateKey, input: &[u8]) -> JwtResult<Vec<u8>> {
    let signed = match hash {
        HashAlg::Sha256 => rsa_sign!(pkcs1v15, Sha256, key, input),
        HashAlg::Sha384 => rsa_sign!(pkcs1v15, Sha384, key, input),
        HashAlg::Sha512 => rsa_sign!(pkcs1v15, Sha512, key, input),
    };
    signed.map_err(|err| JwtError::InvalidKey(err.to_string()))
}

fn pss_sign(hash: HashAlg, key: &RsaPrivateKey, input: &[u8]) -> JwtResult<Vec<u8>> {
    let signed = match hash {
        HashAlg::Sha256 => pss_sign!(Sha256, key, input),
        HashAlg::Sha384 => pss_sign!(Sha384, key, input),
        HashAlg::Sha512 => pss_sign!(Sha512, key, input),
    };
    signed.map_err(|err| JwtError::InvalidKey(err.to_string()))
}

fn pkcs1_verify(hash: HashAlg, key: &RsaPublicKey, signature: &[u8], input: &[u8]) -> bool {
    match hash {
        HashAlg::Sha256 => rsa_verify!(pkcs1v15, Sha256, key, signature, input),
        HashAlg::Sha384 => rsa_verify!(pkcs1v15, Sha384, key, signature, input),
        HashAlg::Sha512 => rsa_verify!(pkcs1v15, Sha512, key, signature, input),
    }
}

fn pss_verify(hash: HashAlg, key: &RsaPublicKey, signature: &[u8], input: &[u8]) -> bool {
    match hash {
        HashAlg::Sha256 => rsa_verify!(pss, Sha256, key, signature, input),
        HashAlg::Sha384 => rsa_verify!(pss, Sha384, key, signature, input),
        HashAlg::Sha512 => rsa_verify!(pss, Sha512, key, signature, input),
    }
}

fn p256_verify(key: &p256::ecdsa::VerifyingKey, signature: &[u8], input: &[u8]) -> bool {
    use p256::ecdsa::signature::Verifier as _;
    p256::ecdsa::Signature::from_slice(signature)
        .map(|signature| key.verify(input, &signature).is_ok())
        .unwrap_or(false)
}

fn p384_verify(key: &p384::ecdsa::VerifyingKey, signature: &[u8], input: &[u8]) -> bool {
    use p384::ecdsa::signature::Verifier as _;
    p384::ecdsa::Signature::from_slice(signature)
        .map(|signature| key.verify(input, &signature).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::Algorithm;

    fn hs256() -> JwtKey {
        JwtKey::hmac(Algorithm::HS256, b"signer-test-secret").unwrap()
    }

    #[test]
    fn hmac_is_deterministic_and_sized_by_hash() {
        let key = hs256();
        let first = sign("HS256", &key, "a.b").unwrap();
        let second = sign("HS256", &key, "a.b").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);

        let key = JwtKey::hmac(Algorithm::HS512, b"signer-test-secret").unwrap();
        assert_eq!(sign("HS512", &key, "a.b").unwrap().len(), 64);
    }

    #[test]
    fn hmac_verify_checks_exact_bytes() {
        let key = hs256();
        let tag = sign("HS256", &key, "header.payload").unwrap();
        assert!(verify("HS256", &key, &tag, "header.payload").unwrap());
        assert!(!verify("HS256", &key, &tag, "header.payload2").unwrap());
        assert!(!verify("HS256", &key, &tag[..31], "header.payload").unwrap());
        assert!(!verify("HS256", &key, &[], "header.payload").unwrap());
    }

    #[test]
    fn mismatched_key_fails_before_computing() {
        let key = hs256();
        assert_eq!(
            sign("HS384", &key, "a.b").unwrap_err(),
            JwtError::AlgorithmKeyMismatch("HS384".into())
        );
        assert_eq!(
            verify("ES256", &key, &[0u8; 64], "a.b").unwrap_err(),
            JwtError::AlgorithmKeyMismatch("ES256".into())
        );
        assert_eq!(
            sign("XS999", &key, "a.b").unwrap_err(),
            JwtError::UnsupportedAlgorithm("XS999".into())
        );
    }

    #[test]
    fn es256_round_trip_and_public_only_verification() {
        let signing = p256::ecdsa::SigningKey::from_slice(&[11u8; 32]).unwrap();
        let public = JwtKey::es256_public(signing.verifying_key().clone());
        let private = JwtKey::es256_private(signing);

        let signature = sign("ES256", &private, "h.p").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify("ES256", &public, &signature, "h.p").unwrap());
        assert!(verify("ES256", &private, &signature, "h.p").unwrap());
        assert!(!verify("ES256", &public, &signature, "h.q").unwrap());
        assert_eq!(
            sign("ES256", &public, "h.p").unwrap_err(),
            JwtError::AlgorithmKeyMismatch("ES256".into())
        );
    }

    #[test]
    fn es384_uses_its_own_curve() {
        let signing = p384::ecdsa::SigningKey::from_slice(&[5u8; 48]).unwrap();
        let key = JwtKey::es384_private(signing);
        let signature = sign("ES384", &key, "h.p").unwrap();
        assert_eq!(signature.len(), 96);
        assert!(verify("ES384", &key, &signature, "h.p").unwrap());
        assert!(sign("ES256", &key, "h.p").is_err());
    }
}
