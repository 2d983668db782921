// ============================
// crates/starterkit-lib/src/auth/tokens.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Token material for locally issued sessions
Access and refresh tokens are random, URL-safe and carry no claims;
only the issuing provider can map them back to a subject. */
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use starterkit_common::{Session, User};

use crate::error::ProviderError;

/// Token size in bytes (32 bytes = 256 bits of entropy)
const TOKEN_BYTES: usize = 32;

/** Generate a cryptographically secure random token
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token() -> String {
    let mut buffer = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

/** Issue a bearer session for `user`
# Arguments
* `ttl` - Lifetime of the access token
* `now` - Issuance timestamp

Fails when `now + ttl` falls outside the representable time range. */
pub fn issue_session(
    user: User,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Session, ProviderError> {
    let expires_at = now
        .checked_add_signed(ttl)
        .ok_or_else(|| ProviderError::new("session lifetime out of range"))?;
    Ok(Session {
        access_token: generate_secure_token(),
        refresh_token: generate_secure_token(),
        token_type: "bearer".to_string(),
        issued_at: now,
        expires_at,
        user,
    })
}
