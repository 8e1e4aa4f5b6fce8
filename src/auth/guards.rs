//! Rocket request guards implementing the tenant-resolution precedence
//! chain (spec §4.2). First match wins:
//!   1. Bearer API token (`oag_...`) → ExternalApiToken
//!   2. JWT bearer → User
//!   3. Subdomain → public/customer routes only
//!   4. `x-dealership-id` header → only from an authenticated super_admin
//!
//! Extension HMAC auth (spec §4.2 step 2) is not implemented here: a
//! `FromRequest` guard runs before any `FromData` guard resolves the body,
//! so it cannot see the bytes a body-inclusive signature needs to cover.
//! See DESIGN.md.
//!
//! If none yields a dealership for a route that needs one, the route itself
//! returns `ApiError::Auth(AuthFailure::DealershipRequired)`.

use crate::auth::tokens::{verify_api_token, verify_jwt, Claims};
use crate::config::Config;
use crate::db::Store;
use crate::errors::AuthFailure;
use crate::models::{Capability, ExternalApiToken, Role};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use std::sync::Arc;

/// Extracted client IP, honoring a reverse proxy's `X-Forwarded-For` first.
pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .or_else(|| req.remote().map(|r| r.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

/// The resolved tenant + whichever auth mechanism resolved it.
pub enum Principal {
    ApiToken(ExternalApiToken),
    User(Claims),
    /// Subdomain-resolved dealership with no authenticated user (public routes).
    Subdomain(i64),
}

pub struct TenantContext {
    pub dealership_id: i64,
    pub principal: Principal,
}

impl TenantContext {
    pub fn user(&self) -> Option<&Claims> {
        match &self.principal {
            Principal::User(c) => Some(c),
            _ => None,
        }
    }

    pub fn api_token(&self) -> Option<&ExternalApiToken> {
        match &self.principal {
            Principal::ApiToken(t) => Some(t),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|c| c.role)
    }

    /// Role gate (spec §4.2): the route's minimum role must be admitted.
    pub fn require_role(&self, min: Role) -> Result<(), AuthFailure> {
        match self.role() {
            Some(role) if role.admits(min) => Ok(()),
            Some(_) => Err(AuthFailure::RoleTooLow),
            None => Err(AuthFailure::MissingCredentials),
        }
    }

    /// Capability gate (spec §4.2, external API only).
    pub fn require_capabilities(&self, required: &[Capability]) -> Result<(), AuthFailure> {
        match self.api_token() {
            Some(token) if token.has_all(required) => Ok(()),
            Some(_) => Err(AuthFailure::CapabilityMissing),
            None => Err(AuthFailure::MissingCredentials),
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role() == Some(Role::SuperAdmin)
    }

    /// Writes an audit log entry for a state-changing action and, if this
    /// request is inside an active impersonation session, bumps its action
    /// counter (spec §4.2: "every state-changing action... increments its
    /// counter and writes an audit log carrying both identities").
    pub fn audit(&self, store: &Store, ip: &ClientIp, action: &str, resource: &str, resource_id: Option<&str>) {
        let Some(claims) = self.user() else { return };
        let now = chrono::Utc::now().to_rfc3339();
        let details = claims
            .impersonated_by
            .map(|admin_id| serde_json::json!({"impersonatedBy": admin_id}));
        crate::store::audit::record(
            store,
            Some(self.dealership_id),
            claims.sub,
            action,
            resource,
            resource_id,
            details.as_ref(),
            Some(&ip.0),
            &now,
        );
        if let Some(admin_id) = claims.impersonated_by
            && let Some(session) = crate::store::sessions::active_for(store, admin_id)
        {
            crate::store::sessions::record_action(store, session.id);
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TenantContext {
    type Error = AuthFailure;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let store = match req.rocket().state::<Arc<Store>>() {
            Some(s) => s.as_ref(),
            None => {
                return Outcome::Error((
                    Status::InternalServerError,
                    AuthFailure::MissingCredentials,
                ))
            }
        };
        let config = match req.rocket().state::<Config>() {
            Some(c) => c,
            None => {
                return Outcome::Error((
                    Status::InternalServerError,
                    AuthFailure::MissingCredentials,
                ))
            }
        };

        let auth_header = req.headers().get_one("Authorization");

        // 1. Bearer API token (`oag_...`).
        if let Some(auth) = auth_header
            && let Some(raw) = auth.strip_prefix("Bearer ")
            && raw.starts_with("oag_")
        {
            let prefix = crate::auth::tokens::api_token_prefix(raw);
            let candidates = crate::store::api_tokens::find_by_prefix(store, &prefix);
            for candidate in candidates {
                if !candidate.is_active {
                    continue;
                }
                if let Some(expires_at) = &candidate.expires_at
                    && expires_at.as_str() < chrono::Utc::now().to_rfc3339().as_str()
                {
                    continue;
                }
                if verify_api_token(raw, &candidate.token_hash) {
                    crate::store::api_tokens::touch_last_used(store, candidate.id);
                    let dealership_id = candidate.dealership_id;
                    return Outcome::Success(TenantContext {
                        dealership_id,
                        principal: Principal::ApiToken(candidate),
                    });
                }
            }
            return Outcome::Error((Status::Unauthorized, AuthFailure::InvalidCredentials));
        }

        // 2. JWT bearer.
        if let Some(auth) = auth_header
            && let Some(raw) = auth.strip_prefix("Bearer ")
        {
            if let Some(claims) = verify_jwt(&config.jwt_secret, raw) {
                let now = chrono::Utc::now().timestamp();
                if claims.exp != 0 && claims.exp < now {
                    return Outcome::Error((Status::Unauthorized, AuthFailure::TokenExpired));
                }
                if !crate::store::users::is_active(store, claims.sub) {
                    return Outcome::Error((Status::Unauthorized, AuthFailure::InvalidCredentials));
                }
                return match claims.dealership_id {
                    Some(dealership_id) => Outcome::Success(TenantContext {
                        dealership_id,
                        principal: Principal::User(claims),
                    }),
                    None if claims.role == Role::SuperAdmin => {
                        // super_admin with no dealership context yet; resolved
                        // further below via x-dealership-id.
                        if let Some(hdr) = req.headers().get_one("x-dealership-id")
                            && let Ok(dealership_id) = hdr.parse::<i64>()
                        {
                            Outcome::Success(TenantContext {
                                dealership_id,
                                principal: Principal::User(claims),
                            })
                        } else {
                            Outcome::Error((Status::BadRequest, AuthFailure::DealershipRequired))
                        }
                    }
                    None => Outcome::Error((Status::BadRequest, AuthFailure::DealershipRequired)),
                };
            }
            return Outcome::Error((Status::Unauthorized, AuthFailure::InvalidCredentials));
        }

        // 3. Subdomain (public/customer routes only).
        if let Some(host) = req.headers().get_one("Host")
            && let Some(sub) = host.split('.').next()
            && let Some(dealership) = crate::store::dealerships::find_by_subdomain(store, sub)
        {
            return Outcome::Success(TenantContext {
                dealership_id: dealership.id,
                principal: Principal::Subdomain(dealership.id),
            });
        }

        Outcome::Error((Status::BadRequest, AuthFailure::DealershipRequired))
    }
}
