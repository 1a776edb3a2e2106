pub mod algorithms;
pub mod base64url;
pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod extractors;
pub mod keys;
pub mod service;
pub mod signer;
pub mod token;
pub mod validation;

pub use algorithms::{is_compatible, resolve, Algorithm, AlgorithmSpec, Curve, Family, HashAlg};
pub use claims::{Claims, Header};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, JwtConfig};
pub use error::{AuthError, AuthRejection, AuthResult, JwtError, JwtResult};
pub use extractors::AuthContext;
pub use keys::JwtKey;
pub use service::{create, verify, Expiry, TokenService, TokenServiceConfig};
pub use validation::{validate_claims, DEFAULT_LEEWAY_SECONDS};
