use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::auth;
use crate::db::models::Role;
use crate::error::{AppError, AppResult};
use crate::extractors::{admin_credential_ok, MaybePrincipal, USER_COOKIE};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/login", post(login))
        .route("/api/users/logout", post(logout))
        .route("/api/session", get(session))
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> AppResult<Response> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(AppError::Validation("email and password required".into()));
    }
    let token = auth::login(&state, &body.email, &body.password, Role::User)?;
    let cookie = super::auth_cookie(USER_COOKIE, &token, state.config.auth.token_hours);
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "token": token })),
    )
        .into_response())
}

async fn logout() -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, super::clear_cookie(USER_COOKIE))]),
        Json(json!({ "ok": true })),
    )
        .into_response()
}

/// Who is calling? Admin secret wins, then any valid signed token, then
/// anonymous. Read-only; never rejects.
async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
    MaybePrincipal(claims): MaybePrincipal,
) -> Json<serde_json::Value> {
    if admin_credential_ok(&state, &headers) {
        return Json(json!({
            "authenticated": true,
            "principal": { "role": Role::Admin },
        }));
    }
    match claims {
        Some(c) => Json(json!({
            "authenticated": true,
            "principal": { "id": c.sub, "email": c.email, "role": c.role },
        })),
        None => Json(json!({ "authenticated": false })),
    }
}
