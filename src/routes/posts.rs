use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{MediaType, Post, PostStatus, ReasonCategory};
use crate::error::{AppError, AppResult};
use crate::extractors::admin_credential_ok;
use crate::media;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/feed", get(feed))
        .route("/api/posts/{id}/like", post(like_post))
        .route("/api/posts/{id}/report", post(report_post))
}

// --- Listing ---

#[derive(Deserialize)]
struct ListQuery {
    all: Option<String>,
}

/// Public listing shows approved posts only. `?all=1` includes pending
/// and rejected posts and therefore requires the admin credential.
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<Post>>> {
    let show_all = query.all.as_deref() == Some("1");
    if show_all && !admin_credential_ok(&state, &headers) {
        return Err(AppError::Unauthorized);
    }

    let conn = state.db.get()?;
    let sql = if show_all {
        format!(
            "SELECT {} FROM posts ORDER BY created_at DESC, id DESC",
            Post::COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM posts WHERE status = 'approved' ORDER BY created_at DESC, id DESC",
            Post::COLUMNS
        )
    };
    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt
        .query_map([], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(posts))
}

#[derive(Deserialize)]
struct FeedQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

async fn feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    let offset = (page - 1).saturating_mul(limit);

    let conn = state.db.get()?;
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE status = 'approved'",
        [],
        |r| r.get(0),
    )?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts WHERE status = 'approved'
         ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        Post::COLUMNS
    ))?;
    let posts = stmt
        .query_map(params![limit, offset], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    // hasMore from the real count, so a total that is an exact multiple
    // of the page size ends cleanly on the last full page.
    let has_more = page.saturating_mul(limit) < total;

    Ok(Json(json!({ "posts": posts, "hasMore": has_more })))
}

// --- Creation ---

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct CreatePostBody {
    title: String,
    description: String,
    category: String,
    tags: String,
    child_email: String,
    media_url: String,
}

struct NewPostInput {
    body: CreatePostBody,
    upload: Option<(String, MediaType)>,
}

/// Accepts either a JSON body or a multipart form with a `media` file.
/// Every new post starts at pending_parent, whoever the author is.
async fn create_post(State(state): State<AppState>, req: Request) -> AppResult<Response> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let input = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?;
        read_multipart(multipart, &state).await?
    } else {
        let Json(body) = Json::<CreatePostBody>::from_request(req, &state)
            .await
            .map_err(|e| AppError::Validation(format!("invalid request body: {e}")))?;
        NewPostInput { body, upload: None }
    };

    let (media_url, media_type) = match input.upload {
        Some((url, media_type)) => (url, media_type),
        None if !input.body.media_url.is_empty() => {
            let media_type = media::from_url(&input.body.media_url);
            (input.body.media_url.clone(), media_type)
        }
        None => {
            return Err(AppError::Validation(
                "media file required or provide mediaUrl in body".into(),
            ))
        }
    };

    let conn = state.db.get()?;
    let author_id: i64 = if input.body.child_email.is_empty() {
        0
    } else {
        conn.query_row(
            "SELECT id FROM users WHERE email = ?1",
            params![input.body.child_email],
            |r| r.get(0),
        )
        .optional()?
        .unwrap_or(0)
    };

    conn.execute(
        "INSERT INTO posts (user_id, title, description, media_url, media_type, category, tags, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            author_id,
            input.body.title,
            input.body.description,
            media_url,
            media_type,
            input.body.category,
            input.body.tags,
            PostStatus::PendingParent,
        ],
    )?;
    let id = conn.last_insert_rowid();

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "title": input.body.title,
            "mediaUrl": media_url,
            "status": PostStatus::PendingParent,
        })),
    )
        .into_response())
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("invalid multipart body: {e}"))
}

async fn read_multipart(mut multipart: Multipart, state: &AppState) -> AppResult<NewPostInput> {
    let mut body = CreatePostBody::default();
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "media" => {
                let file_name =
                    media::sanitize_file_name(field.file_name().unwrap_or("upload"));
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(bad_multipart)?;
                if data.is_empty() {
                    continue;
                }
                let media_type = media::from_upload(content_type.as_deref(), &file_name);
                let stored = format!("{}-{}", uuid::Uuid::now_v7(), file_name);
                let path = state.config.uploads_path().join(&stored);
                tokio::fs::write(&path, &data)
                    .await
                    .map_err(|e| AppError::Internal(format!("failed to store upload: {e}")))?;
                upload = Some((format!("/uploads/{stored}"), media_type));
            }
            "title" => body.title = field.text().await.map_err(bad_multipart)?,
            "description" => body.description = field.text().await.map_err(bad_multipart)?,
            "category" => body.category = field.text().await.map_err(bad_multipart)?,
            "tags" => body.tags = field.text().await.map_err(bad_multipart)?,
            "childEmail" => body.child_email = field.text().await.map_err(bad_multipart)?,
            "mediaUrl" => body.media_url = field.text().await.map_err(bad_multipart)?,
            _ => {}
        }
    }

    Ok(NewPostInput { body, upload })
}

// --- Reactions and reports ---

async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let updated = tx.execute(
        "UPDATE posts SET likes_count = likes_count + 1 WHERE id = ?1",
        params![id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    let likes: i64 = tx.query_row(
        "SELECT likes_count FROM posts WHERE id = ?1",
        params![id],
        |r| r.get(0),
    )?;
    tx.commit()?;

    Ok(Json(json!({ "likesCount": likes })))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ReportBody {
    reporter_id: Option<i64>,
    reason_category: String,
    reason: String,
}

/// Anyone may report. The post escalates for staff review whatever its
/// current status; repeat reports keep it escalated.
async fn report_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<ReportBody>>,
) -> AppResult<Response> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let category = ReasonCategory::coerce(&body.reason_category);

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![id],
        |r| r.get(0),
    )?;
    if !exists {
        return Err(AppError::NotFound);
    }
    tx.execute(
        "INSERT INTO reports (post_id, reporter_id, reason_category, reason)
         VALUES (?1, ?2, ?3, ?4)",
        params![id, body.reporter_id, category, body.reason],
    )?;
    let report_id = tx.last_insert_rowid();
    tx.execute(
        "UPDATE posts SET status = ?1 WHERE id = ?2",
        params![PostStatus::Escalated, id],
    )?;
    tx.commit()?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "reportId": report_id,
            "escalated": true,
            "reasonCategory": category,
        })),
    )
        .into_response())
}
