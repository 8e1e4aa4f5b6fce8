//! Session auth (spec §4.2, §6): password login, the current-user endpoint,
//! and password reset. JWTs are stateless, so logout is a client-side no-op
//! we still expose for symmetry.

use crate::auth::guards::{ClientIp, TenantContext};
use crate::auth::tokens::{self, Claims};
use crate::config::Config;
use crate::db::Store;
use crate::errors::{ApiError, ApiResult, AuthFailure};
use crate::models::Role;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::store;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Rate-limited by email (spec §7: auth failures "rate-limit on repeated").
/// Dealership scoping comes from the user row, not the request's Host header,
/// so a super_admin with no home dealership can still log in from anywhere.
#[post("/auth/login", data = "<body>")]
pub fn login(
    body: Json<LoginRequest>,
    store: &State<Arc<Store>>,
    config: &State<Config>,
    limiter: &State<RateLimiter>,
    limits: &State<RateLimitConfig>,
    _ip: ClientIp,
) -> ApiResult<Json<serde_json::Value>> {
    let key = format!("login:{}", body.email.to_lowercase());
    if !limiter.check(&key, limits.login_max, limits.login_window_secs) {
        return Err(ApiError::Auth(crate::errors::AuthFailure::InvalidCredentials));
    }

    let user = store::users::find_by_email(store, &body.email)
        .ok_or(ApiError::Auth(crate::errors::AuthFailure::InvalidCredentials))?;
    if !user.is_active || !crate::auth::verify_password(&body.password, &user.password_hash) {
        return Err(ApiError::Auth(crate::errors::AuthFailure::InvalidCredentials));
    }

    let now = chrono::Utc::now();
    let token = tokens::issue_jwt(
        &config.jwt_secret,
        user.id,
        &user.email,
        user.role,
        user.dealership_id,
        None,
        now,
    );
    Ok(Json(serde_json::json!({
        "token": token,
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "role": user.role.as_str(),
            "dealershipId": user.dealership_id,
        }
    })))
}

#[get("/auth/me")]
pub fn me(ctx: TenantContext, store: &State<Arc<Store>>) -> ApiResult<Json<serde_json::Value>> {
    let claims: &Claims = ctx.user().ok_or(crate::errors::AuthFailure::MissingCredentials)?;
    let user = store::users::get_by_id_unscoped(store, claims.sub)
        .ok_or_else(|| ApiError::Input("not found".to_string()))?;
    Ok(Json(serde_json::json!({
        "id": user.id,
        "email": user.email,
        "name": user.name,
        "role": user.role.as_str(),
        "dealershipId": user.dealership_id,
        "impersonatedBy": claims.impersonated_by,
    })))
}

/// Stateless JWTs have nothing to invalidate server-side; kept for client symmetry.
#[post("/auth/logout")]
pub fn logout() -> rocket::http::Status {
    rocket::http::Status::NoContent
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Always returns success regardless of whether the email exists
/// (enumeration-resistant, spec §4.2).
#[post("/auth/forgot-password", data = "<body>")]
pub fn forgot_password(
    body: Json<ForgotPasswordRequest>,
    store: &State<Arc<Store>>,
    limiter: &State<RateLimiter>,
    limits: &State<RateLimitConfig>,
) -> Json<serde_json::Value> {
    let key = format!("password-reset:{}", body.email.to_lowercase());
    if limiter.check(&key, limits.password_reset_max, limits.password_reset_window_secs)
        && let Some(user) = store::users::find_by_email(store, &body.email)
    {
        let raw = tokens::generate_password_reset_token();
        let hash = crate::auth::hash_password(&raw).unwrap_or_default();
        let now = chrono::Utc::now();
        let expires_at = now + chrono::Duration::minutes(tokens::PASSWORD_RESET_TTL_MINUTES);
        store::users::store_password_reset_token(
            store,
            &hash,
            user.id,
            &expires_at.to_rfc3339(),
            &now.to_rfc3339(),
        )
        .ok();
        // Actual delivery is out of scope here; an email adapter call would go here.
    }
    Json(serde_json::json!({"success": true}))
}

fn find_reset_token(store: &Store, raw: &str) -> Option<(String, i64, String)> {
    store::users::active_password_reset_tokens(store)
        .into_iter()
        .find(|(hash, _, _)| crate::auth::verify_password(raw, hash))
}

#[get("/auth/reset-password/<token>")]
pub fn check_reset_token(token: &str, store: &State<Arc<Store>>) -> Json<serde_json::Value> {
    let now = chrono::Utc::now().to_rfc3339();
    let valid = find_reset_token(store, token)
        .map(|(_, _, expires_at)| expires_at.as_str() > now.as_str())
        .unwrap_or(false);
    Json(serde_json::json!({"valid": valid}))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[post("/auth/reset-password", data = "<body>")]
pub fn reset_password(
    body: Json<ResetPasswordRequest>,
    store: &State<Arc<Store>>,
) -> ApiResult<Json<serde_json::Value>> {
    let now = chrono::Utc::now().to_rfc3339();
    let (hash, user_id, expires_at) = find_reset_token(store, &body.token)
        .ok_or_else(|| ApiError::Input("invalid or expired token".to_string()))?;
    if expires_at.as_str() <= now.as_str() {
        return Err(ApiError::Input("invalid or expired token".to_string()));
    }
    store::users::consume_password_reset_token(store, &hash, &now)?;
    let new_hash = crate::auth::hash_password(&body.password)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    store::users::set_password_hash(store, user_id, &new_hash)?;
    Ok(Json(serde_json::json!({"success": true})))
}

/// Starts impersonating `user_id` (spec §4.2): issues a JWT minted as the
/// target, carrying `impersonated_by` so every later request's audit trail
/// names both identities. A super_admin may hold only one active session;
/// starting a new one ends the prior.
#[post("/auth/impersonate/<user_id>")]
pub fn impersonate(
    user_id: i64,
    ctx: TenantContext,
    store: &State<Arc<Store>>,
    config: &State<Config>,
    ip: ClientIp,
) -> ApiResult<Json<serde_json::Value>> {
    if !ctx.is_super_admin() {
        return Err(ApiError::Auth(AuthFailure::RoleTooLow));
    }
    let admin = ctx.user().ok_or(AuthFailure::MissingCredentials)?;
    let target = store::users::get_by_id_unscoped(store, user_id)
        .ok_or_else(|| ApiError::Input("not found".to_string()))?;
    if target.role == Role::SuperAdmin {
        return Err(ApiError::Input("cannot impersonate another super_admin".to_string()));
    }

    let now = chrono::Utc::now();
    let now_str = now.to_rfc3339();
    if let Some(active) = store::sessions::active_for(store, admin.sub) {
        store::sessions::end(store, active.id, &now_str).ok();
    }
    let session = store::sessions::start(store, admin.sub, target.id, &now_str)?;
    store::audit::record(
        store,
        target.dealership_id,
        admin.sub,
        "impersonation.start",
        "user",
        Some(&target.id.to_string()),
        None,
        Some(&ip.0),
        &now_str,
    );

    let token = tokens::issue_jwt(
        &config.jwt_secret,
        target.id,
        &target.email,
        target.role,
        target.dealership_id,
        Some(admin.sub),
        now,
    );
    Ok(Json(serde_json::json!({
        "token": token,
        "sessionId": session.id,
        "user": {
            "id": target.id,
            "email": target.email,
            "name": target.name,
            "role": target.role.as_str(),
            "dealershipId": target.dealership_id,
        }
    })))
}

/// Ends the impersonation session behind the current JWT, if any (spec §4.2).
#[post("/auth/end-impersonation")]
pub fn end_impersonation(ctx: TenantContext, store: &State<Arc<Store>>) -> ApiResult<Json<serde_json::Value>> {
    let claims = ctx.user().ok_or(AuthFailure::MissingCredentials)?;
    let admin_id = claims
        .impersonated_by
        .ok_or_else(|| ApiError::Input("not impersonating".to_string()))?;
    let now = chrono::Utc::now().to_rfc3339();
    if let Some(active) = store::sessions::active_for(store, admin_id) {
        store::sessions::end(store, active.id, &now)?;
    }
    Ok(Json(serde_json::json!({"success": true})))
}
