use axum::extract::State;
use axum::http::header;
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::extractors::ADMIN_COOKIE;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/login", post(login))
        .route("/api/admin/logout", post(logout))
}

#[derive(Deserialize)]
struct LoginBody {
    token: String,
}

/// Exchange the shared secret for an HttpOnly cookie holding the same
/// value. Cookie and header are the same trust level; the cookie just
/// spares a browser from re-sending the secret by hand.
async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> AppResult<Response> {
    if body.token.is_empty() || body.token != state.config.auth.admin_token {
        return Err(AppError::Unauthorized);
    }
    let cookie = super::auth_cookie(ADMIN_COOKIE, &body.token, state.config.auth.token_hours);
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "ok": true })),
    )
        .into_response())
}

async fn logout() -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, super::clear_cookie(ADMIN_COOKIE))]),
        Json(json!({ "ok": true })),
    )
        .into_response()
}
