use axum::http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type JwtResult<T> = Result<T, JwtError>;
pub type AuthResult<T> = Result<T, AuthError>;

/// Failure kinds produced while creating or verifying a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JwtError {
    #[error("malformed token: {0}")]
    MalformedToken(&'static str),
    #[error("unsupported algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("key cannot be used with algorithm '{0}'")]
    AlgorithmKeyMismatch(String),
    #[error("token algorithm '{0}' does not match the verification key")]
    AlgorithmMismatch(String),
    #[error("claim '{0}' has an invalid value")]
    InvalidClaims(&'static str),
    #[error("token expired")]
    TokenExpired,
    #[error("token not yet valid")]
    TokenNotYetValid,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl JwtError {
    /// Stable label used for logs and metrics. Never sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            JwtError::MalformedToken(_) => "malformed_token",
            JwtError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            JwtError::AlgorithmKeyMismatch(_) => "algorithm_key_mismatch",
            JwtError::AlgorithmMismatch(_) => "algorithm_mismatch",
            JwtError::InvalidClaims(_) => "invalid_claims",
            JwtError::TokenExpired => "token_expired",
            JwtError::TokenNotYetValid => "token_not_yet_valid",
            JwtError::SignatureMismatch => "signature_mismatch",
            JwtError::InvalidKey(_) => "invalid_key",
        }
    }
}

/// Request authentication failure. Every variant renders the same 401 body.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error("token rejected: {0}")]
    Token(#[from] JwtError),
}

impl AuthError {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingAuthorization => "missing_authorization",
            AuthError::InvalidAuthorization => "invalid_authorization",
            AuthError::Token(err) => err.kind(),
        }
    }
}

/// Response extension carrying the rejection kind for server-side metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRejection {
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: "unauthenticated",
            message: "authentication required",
        };
        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response.extensions_mut().insert(AuthRejection { kind: self.kind() });
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_failure_renders_identical_response() {
        let failures = vec![
            AuthError::MissingAuthorization,
            AuthError::InvalidAuthorization,
            AuthError::Token(JwtError::TokenExpired),
            AuthError::Token(JwtError::SignatureMismatch),
            AuthError::Token(JwtError::MalformedToken("expected three segments")),
        ];

        for failure in failures {
            let kind = failure.kind();
            let response = failure.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");
            let rejection = response.extensions().get::<AuthRejection>().copied();
            assert_eq!(rejection, Some(AuthRejection { kind }));
        }
    }

    #[test]
    fn token_failures_keep_specific_kind() {
        let err = AuthError::from(JwtError::AlgorithmMismatch("HS512".into()));
        assert_eq!(err.kind(), "algorithm_mismatch");
    }
}
