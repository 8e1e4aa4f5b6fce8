//! Token issuance/verification (spec §4.2): session JWTs, external API
//! tokens (`oag_...`), and single-use password-reset tokens.

use crate::models::Role;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// JWT claims. `dealership_id` is null for a global super_admin.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub role: Role,
    pub dealership_id: Option<i64>,
    pub exp: i64,
    /// Set when this token was minted by an active impersonation session,
    /// so audit logging can carry both identities (spec §4.2).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonated_by: Option<i64>,
}

pub const SESSION_TTL_HOURS: i64 = 24;

pub fn issue_jwt(
    secret: &str,
    user_id: i64,
    email: &str,
    role: Role,
    dealership_id: Option<i64>,
    impersonated_by: Option<i64>,
    now: chrono::DateTime<chrono::Utc>,
) -> String {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        dealership_id,
        exp: (now + chrono::Duration::hours(SESSION_TTL_HOURS)).timestamp(),
        impersonated_by,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("JWT encoding with an HS256 key never fails")
}

pub fn verify_jwt(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// External API token format: `oag_<short_name>_<url-safe-random>` (spec §6).
/// The prefix up to and including the second underscore is stored indexed;
/// the full raw value is returned exactly once at creation.
pub struct GeneratedApiToken {
    pub raw: String,
    pub prefix: String,
    pub hash: String,
}

pub fn generate_api_token(short_name: &str) -> GeneratedApiToken {
    let random = random_url_safe(24);
    let safe_name: String = short_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(16)
        .collect();
    let raw = format!("oag_{safe_name}_{random}");
    let prefix = api_token_prefix(&raw);
    let hash = bcrypt::hash(&raw, bcrypt::DEFAULT_COST).expect("bcrypt hashing should not fail");
    GeneratedApiToken { raw, prefix, hash }
}

/// The prefix stored indexed: everything up to and including the second underscore.
pub fn api_token_prefix(raw: &str) -> String {
    let mut seen = 0;
    for (i, c) in raw.char_indices() {
        if c == '_' {
            seen += 1;
            if seen == 2 {
                return raw[..=i].to_string();
            }
        }
    }
    raw.to_string()
}

pub fn verify_api_token(raw: &str, hash: &str) -> bool {
    bcrypt::verify(raw, hash).unwrap_or(false)
}

/// 32-byte random password-reset token, bcrypt-hashed in Store, 1-hour TTL, single-use.
pub fn generate_password_reset_token() -> String {
    random_url_safe(32)
}

pub const PASSWORD_RESET_TTL_MINUTES: i64 = 60;

fn random_url_safe(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, &buf)
}

/// Single-use posting token value (spec §4.5).
pub fn generate_posting_token() -> String {
    random_url_safe(24)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_roundtrips() {
        let now = chrono::Utc::now();
        let token = issue_jwt("secret", 1, "a@b.com", Role::Admin, Some(5), None, now);
        let claims = verify_jwt("secret", &token).unwrap();
        assert_eq!(claims.sub, 1);
        assert_eq!(claims.dealership_id, Some(5));
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let now = chrono::Utc::now();
        let token = issue_jwt("secret", 1, "a@b.com", Role::Admin, Some(5), None, now);
        assert!(verify_jwt("other-secret", &token).is_none());
    }

    #[test]
    fn api_token_prefix_stops_at_second_underscore() {
        let t = generate_api_token("acme");
        assert!(t.raw.starts_with(&t.prefix));
        assert_eq!(t.prefix.matches('_').count(), 2);
    }

    #[test]
    fn api_token_verifies_against_its_own_hash() {
        let t = generate_api_token("acme");
        assert!(verify_api_token(&t.raw, &t.hash));
        assert!(!verify_api_token("oag_acme_wrong", &t.hash));
    }
}
