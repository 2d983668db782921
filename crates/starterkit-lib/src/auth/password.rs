// ============================
// crates/starterkit-lib/src/auth/password.rs
// ============================
//! Password hashing for providers that keep credentials locally.
use crate::error::ProviderError;
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use zeroize::Zeroize;

/// scrypt cost for the in-process credential store
const STORE_LOG_N: u8 = 10;
const STORE_R: u32 = 8;
const STORE_P: u32 = 1;

/// Hash a password using scrypt
pub fn hash_password(plain: &str) -> Result<String, ProviderError> {
    let params = Params::new(STORE_LOG_N, STORE_R, STORE_P, Params::RECOMMENDED_LEN)
        .map_err(|e| ProviderError::new(format!("invalid scrypt parameters: {e}")))?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)
        .map_err(|e| ProviderError::new(format!("password hashing failed: {e}")))?
        .to_string();
    Ok(hash)
}

/// Verify a password against a hash
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}

/// Hash a password and zeroize the original
pub fn hash_password_secure(plain: &mut String) -> Result<String, ProviderError> {
    let hash = hash_password(plain);
    plain.zeroize();
    hash
}
