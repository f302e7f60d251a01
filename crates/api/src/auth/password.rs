//! Argon2id password hashing and verification.
//!
//! Hashes use a random salt from [`OsRng`] and are stored in PHC string
//! format, so parameters and salt travel with the hash.

use std::sync::LazyLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Stand-in hash verified against when a login names no existing account.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("armorsight-no-such-user").expect("hashing a constant"));

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch; `Err` only for a malformed stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Verify `password` against `hash`, or against a fixed dummy hash when the
/// account does not exist.
///
/// Both branches run one full Argon2 verification, so an unknown usercode is
/// rejected as slowly as a wrong password. The dummy branch always returns
/// `Ok(false)`.
pub fn verify_password_or_dummy(
    password: &str,
    hash: Option<&str>,
) -> Result<bool, argon2::password_hash::Error> {
    match hash {
        Some(hash) => verify_password(password, hash),
        None => {
            verify_password(password, &DUMMY_HASH)?;
            Ok(false)
        }
    }
}
