use argon2::{
    password_hash::{self, PasswordHash, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;

/// Hashing seam so handlers never touch argon2 directly.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, password_hash::Error>;

    /// Checks `password` against `stored`. A missing hash still costs one
    /// verification so unknown and known usernames take the same time.
    fn verify(&self, password: &str, stored: Option<&str>) -> bool;
}

pub struct Argon2Passwords {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl Argon2Passwords {
    pub fn new(params: Params) -> Result<Self, password_hash::Error> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, "not-a-real-password")?;
        Ok(Self { argon2, dummy_hash })
    }
}

impl std::fmt::Debug for Argon2Passwords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Passwords").finish_non_exhaustive()
    }
}

impl PasswordHasher for Argon2Passwords {
    fn hash(&self, password: &str) -> Result<String, password_hash::Error> {
        hash_with(&self.argon2, password)
    }

    fn verify(&self, password: &str, stored: Option<&str>) -> bool {
        let (candidate, known) = match stored {
            Some(hash) => (hash, true),
            None => (self.dummy_hash.as_str(), false),
        };
        let matches = match PasswordHash::new(candidate) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        };
        known && matches
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, password_hash::Error> {
    use argon2::password_hash::PasswordHasher as _;

    let salt = SaltString::generate(&mut OsRng);
    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Passwords {
        Argon2Passwords::new(Params::new(8, 1, 1, None).unwrap()).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let passwords = cheap();
        let hash = passwords.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(passwords.verify("correct horse", Some(&hash)));
        assert!(!passwords.verify("battery staple", Some(&hash)));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let passwords = cheap();
        assert_ne!(
            passwords.hash("same-password").unwrap(),
            passwords.hash("same-password").unwrap()
        );
    }

    #[test]
    fn unknown_user_never_verifies() {
        let passwords = cheap();
        assert!(!passwords.verify("not-a-real-password", None));
        assert!(!passwords.verify("anything", Some("not a phc string")));
    }
}
