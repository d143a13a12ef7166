use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use serde_json::json;

use crate::auth;
use crate::db::models::{ChildSummary, ModerationAction, Post, PostStatus, Role};
use crate::error::{AppError, AppResult};
use crate::extractors::{ParentPrincipal, PARENT_COOKIE};
use crate::modlog;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/parents/login", post(login))
        .route("/api/parents/logout", post(logout))
        .route("/api/parents/me/children", get(children))
        .route("/api/parents/me/pending", get(pending))
        .route("/api/parents/me/posts/{id}/approve", post(approve))
        .route("/api/parents/me/posts/{id}/reject", post(reject))
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
    let token = auth::login(&state, &body.email, &body.password, Role::Parent)?;
    let cookie = super::auth_cookie(PARENT_COOKIE, &token, state.config.auth.token_hours);
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "token": token })),
    )
        .into_response())
}

async fn logout() -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, super::clear_cookie(PARENT_COOKIE))]),
        Json(json!({ "ok": true })),
    )
        .into_response()
}

async fn children(
    State(state): State<AppState>,
    parent: ParentPrincipal,
) -> AppResult<Json<Vec<ChildSummary>>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT u.id, u.email, u.display_name, u.role FROM parent_child pc
         JOIN users u ON u.id = pc.child_user_id
         WHERE pc.parent_user_id = ?1 ORDER BY u.id",
    )?;
    let rows = stmt
        .query_map(params![parent.id], |r| {
            Ok(ChildSummary {
                id: r.get(0)?,
                email: r.get(1)?,
                display_name: r.get(2)?,
                role: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(rows))
}

/// Posts by linked children still waiting on this parent.
async fn pending(
    State(state): State<AppState>,
    parent: ParentPrincipal,
) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts p
         JOIN parent_child pc ON pc.child_user_id = p.user_id
         WHERE pc.parent_user_id = ?1 AND p.status = 'pending_parent'
         ORDER BY p.created_at DESC, p.id DESC",
        Post::columns_with("p")
    ))?;
    let posts = stmt
        .query_map(params![parent.id], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(posts))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RejectBody {
    reason: String,
}

async fn approve(
    State(state): State<AppState>,
    parent: ParentPrincipal,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    moderate_as_parent(&state, &parent, id, PostStatus::Approved, None)?;
    Ok(Json(json!({ "id": id, "status": PostStatus::Approved })))
}

async fn reject(
    State(state): State<AppState>,
    parent: ParentPrincipal,
    Path(id): Path<i64>,
    body: Option<Json<RejectBody>>,
) -> AppResult<Json<serde_json::Value>> {
    let reason = body.map(|Json(b)| b.reason).unwrap_or_default();
    moderate_as_parent(&state, &parent, id, PostStatus::Rejected, Some(&reason))?;
    Ok(Json(json!({ "id": id, "status": PostStatus::Rejected })))
}

/// A parent may only act on a post whose author is a linked child. The
/// link check and the status update commit as one transaction.
fn moderate_as_parent(
    state: &AppState,
    parent: &ParentPrincipal,
    post_id: i64,
    status: PostStatus,
    reason: Option<&str>,
) -> AppResult<()> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let author_id: i64 = tx
        .query_row(
            "SELECT user_id FROM posts WHERE id = ?1",
            params![post_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(AppError::NotFound)?;

    let linked: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM parent_child WHERE parent_user_id = ?1 AND child_user_id = ?2",
        params![parent.id, author_id],
        |r| r.get(0),
    )?;
    if !linked {
        return Err(AppError::Forbidden("not authorized for this post".into()));
    }

    if status == PostStatus::Approved {
        tx.execute(
            "UPDATE posts SET status = ?1, parent_approved_by = ?2 WHERE id = ?3",
            params![status, parent.id, post_id],
        )?;
    } else {
        tx.execute(
            "UPDATE posts SET status = ?1 WHERE id = ?2",
            params![status, post_id],
        )?;
    }
    tx.commit()?;

    let action = if status == PostStatus::Approved {
        ModerationAction::ParentApprove
    } else {
        ModerationAction::ParentReject
    };
    modlog::append(&conn, post_id, action, &parent.email, reason);

    Ok(())
}
