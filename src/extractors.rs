use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use crate::auth::token::{self, Claims};
use crate::db::models::Role;
use crate::error::AppError;
use crate::state::AppState;

pub const ADMIN_COOKIE: &str = "recess_admin";
pub const PARENT_COOKIE: &str = "recess_parent";
pub const USER_COOKIE: &str = "recess_user";

/// The staff principal. Carries no identity beyond "holder of the shared
/// admin secret"; audit entries record the fixed actor string.
#[derive(Debug, Clone)]
pub struct AdminPrincipal;

impl AdminPrincipal {
    pub fn actor(&self) -> &'static str {
        "admin"
    }
}

/// The admin secret is accepted from the x-admin-token header, the
/// Authorization header (with or without a Bearer prefix), or the admin
/// session cookie. Header and cookie are the same trust level.
pub fn admin_credential_ok(state: &AppState, headers: &HeaderMap) -> bool {
    let expected = state.config.auth.admin_token.as_str();

    let header_token = headers
        .get("x-admin-token")
        .or_else(|| headers.get(header::AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));

    if header_token == Some(expected) {
        return true;
    }

    cookie_value(headers, ADMIN_COOKIE) == Some(expected)
}

impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if admin_credential_ok(state, &parts.headers) {
            Ok(AdminPrincipal)
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

/// An authenticated parent, verified from a signed token. Rejects with
/// 401 on any verification failure or a non-parent role.
#[derive(Debug, Clone)]
pub struct ParentPrincipal {
    pub id: i64,
    pub email: String,
}

impl FromRequestParts<AppState> for ParentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = claims_from_parts(parts, state, &[PARENT_COOKIE])?;
        if claims.role != Role::Parent {
            return Err(AppError::Unauthorized);
        }
        Ok(ParentPrincipal {
            id: claims.sub,
            email: claims.email,
        })
    }
}

/// Optional principal for the session endpoint: any valid parent or user
/// token, or nothing. Never rejects.
pub struct MaybePrincipal(pub Option<Claims>);

impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = claims_from_parts(parts, state, &[PARENT_COOKIE, USER_COOKIE]).ok();
        Ok(MaybePrincipal(claims))
    }
}

fn claims_from_parts(
    parts: &Parts,
    state: &AppState,
    cookies: &[&str],
) -> Result<Claims, AppError> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let raw = bearer
        .or_else(|| {
            cookies
                .iter()
                .find_map(|name| cookie_value(&parts.headers, name))
        })
        .ok_or(AppError::Unauthorized)?;

    token::verify(&state.config.auth.jwt_secret, raw)
}

pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}
