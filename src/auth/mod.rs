//! Tenant & auth fabric (C2, spec §4.2): token primitives, the resolution
//! guard chain, and the password hashing helpers routes call directly.

pub mod guards;
pub mod tokens;

pub use guards::{ClientIp, Principal, TenantContext};
pub use tokens::Claims;

/// bcrypt cost for user passwords. Lower than the default external-API-token
/// cost isn't warranted; both use `bcrypt::DEFAULT_COST`.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
