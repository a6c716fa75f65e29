use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;

use crate::Error;

/// Hashes with a fresh random salt. The result is a PHC string carrying the
/// algorithm, parameters and salt, so two calls never return the same digest.
pub fn hash_password(plaintext: &str) -> Result<String, Error> {
    Ok(Pbkdf2
        .hash_password(plaintext.as_bytes(), &SaltString::generate(&mut OsRng))?
        .to_string())
}

/// A digest that cannot be parsed counts as a mismatch.
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    match PasswordHash::new(digest) {
        Ok(hash) => Pbkdf2.verify_password(plaintext.as_bytes(), &hash).is_ok(),
        Err(err) => {
            log::warn!("Stored password digest is malformed: {}", err);
            false
        }
    }
}
