use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::{params, OptionalExtension, ToSql};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{
    ModerationAction, Post, PostStatus, ReasonCategory, Report, ReportStatus, ReportView,
};
use crate::error::{AppError, AppResult};
use crate::extractors::AdminPrincipal;
use crate::modlog;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/moderation/pending", get(pending_posts))
        .route("/api/moderation/escalated", get(escalated_posts))
        .route("/api/moderation/{id}/approve", post(approve_post))
        .route("/api/moderation/{id}/reject", post(reject_post))
        .route("/api/moderation/report-categories", get(report_categories))
        .route("/api/moderation/stats", get(stats))
        .route("/api/moderation/reports", get(list_reports))
        .route("/api/moderation/reports/bulk", post(bulk_resolve))
        .route("/api/moderation/reports/{id}", get(get_report))
        .route("/api/moderation/reports/{id}/dismiss", post(dismiss_report))
        .route("/api/moderation/reports/{id}/reviewed", post(review_report))
        .route("/api/moderation/reports/{id}/action", post(action_report))
        .route("/api/moderation/posts/{id}/reports", get(reports_for_post))
}

// --- Post moderation ---

/// Everything still waiting on someone: pending, escalated, rejected.
async fn pending_posts(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
) -> AppResult<Json<Vec<Post>>> {
    query_posts(&state, "status != 'approved'")
}

async fn escalated_posts(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
) -> AppResult<Json<Vec<Post>>> {
    query_posts(&state, "status = 'escalated'")
}

fn query_posts(state: &AppState, where_clause: &str) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts WHERE {} ORDER BY created_at DESC, id DESC",
        Post::COLUMNS,
        where_clause
    ))?;
    let posts = stmt
        .query_map([], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(posts))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RejectBody {
    reason: String,
}

async fn approve_post(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    moderate_as_admin(&state, &admin, id, PostStatus::Approved, None)?;
    Ok(Json(json!({ "id": id, "status": PostStatus::Approved })))
}

async fn reject_post(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<i64>,
    body: Option<Json<RejectBody>>,
) -> AppResult<Json<serde_json::Value>> {
    let reason = body.map(|Json(b)| b.reason).unwrap_or_default();
    moderate_as_admin(&state, &admin, id, PostStatus::Rejected, Some(&reason))?;
    Ok(Json(json!({ "id": id, "status": PostStatus::Rejected })))
}

/// Admin authority is global: no relationship check, any current status.
fn moderate_as_admin(
    state: &AppState,
    admin: &AdminPrincipal,
    post_id: i64,
    status: PostStatus,
    reason: Option<&str>,
) -> AppResult<()> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let updated = tx.execute(
        "UPDATE posts SET status = ?1 WHERE id = ?2",
        params![status, post_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    tx.commit()?;

    let action = if status == PostStatus::Approved {
        ModerationAction::Approve
    } else {
        ModerationAction::Reject
    };
    modlog::append(&conn, post_id, action, admin.actor(), reason);

    Ok(())
}

// --- Report triage ---

/// Public: the closed category set, for report forms.
async fn report_categories() -> Json<[ReasonCategory; 9]> {
    Json(ReasonCategory::ALL)
}

const REPORT_VIEW_SELECT: &str = "SELECT r.id, r.post_id, r.reporter_id, r.reason_category, \
     r.reason, r.status, r.staff_notes, r.resolved_by, r.resolved_at, r.created_at, \
     p.title, p.status, reporter.display_name, author.display_name \
     FROM reports r \
     LEFT JOIN posts p ON p.id = r.post_id \
     LEFT JOIN users reporter ON reporter.id = r.reporter_id \
     LEFT JOIN users author ON author.id = p.user_id";

fn report_view_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportView> {
    Ok(ReportView {
        report: Report {
            id: row.get(0)?,
            post_id: row.get(1)?,
            reporter_id: row.get(2)?,
            reason_category: row.get(3)?,
            reason: row.get(4)?,
            status: row.get(5)?,
            staff_notes: row.get(6)?,
            resolved_by: row.get(7)?,
            resolved_at: row.get(8)?,
            created_at: row.get(9)?,
        },
        post_title: row.get(10)?,
        post_status: row.get(11)?,
        reporter_name: row.get(12)?,
        author_name: row.get(13)?,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportsQuery {
    status: Option<String>,
    reason_category: Option<String>,
    post_id: Option<i64>,
}

async fn list_reports(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Query(query): Query<ReportsQuery>,
) -> AppResult<Json<Vec<ReportView>>> {
    // Filters are validated against the closed sets, then inlined.
    let mut clauses: Vec<String> = Vec::new();
    if let Some(ref s) = query.status {
        let status = ReportStatus::parse(s)
            .ok_or_else(|| AppError::Validation(format!("unknown report status: {s}")))?;
        clauses.push(format!("r.status = '{}'", status.as_str()));
    }
    if let Some(ref c) = query.reason_category {
        let category = ReasonCategory::parse(c)
            .ok_or_else(|| AppError::Validation(format!("unknown reason category: {c}")))?;
        clauses.push(format!("r.reason_category = '{}'", category.as_str()));
    }
    if let Some(post_id) = query.post_id {
        clauses.push(format!("r.post_id = {post_id}"));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!(
        "{REPORT_VIEW_SELECT}{where_sql} ORDER BY r.created_at DESC, r.id DESC"
    ))?;
    let reports = stmt
        .query_map([], report_view_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(reports))
}

async fn get_report(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<i64>,
) -> AppResult<Json<ReportView>> {
    let conn = state.db.get()?;
    let report = conn
        .query_row(
            &format!("{REPORT_VIEW_SELECT} WHERE r.id = ?1"),
            params![id],
            report_view_from_row,
        )
        .optional()?
        .ok_or(AppError::NotFound)?;
    Ok(Json(report))
}

async fn reports_for_post(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(post_id): Path<i64>,
) -> AppResult<Json<Vec<ReportView>>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!(
        "{REPORT_VIEW_SELECT} WHERE r.post_id = ?1 ORDER BY r.created_at DESC, r.id DESC"
    ))?;
    let reports = stmt
        .query_map(params![post_id], report_view_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(reports))
}

/// Dashboard counters, computed fresh on each call.
async fn stats(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;

    let mut by_status = serde_json::Map::new();
    {
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM reports GROUP BY status")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        for row in rows {
            let (status, count) = row?;
            by_status.insert(status, count.into());
        }
    }

    let mut pending_by_category = serde_json::Map::new();
    {
        let mut stmt = conn.prepare(
            "SELECT reason_category, COUNT(*) FROM reports WHERE status = 'pending'
             GROUP BY reason_category",
        )?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        for row in rows {
            let (category, count) = row?;
            pending_by_category.insert(category, count.into());
        }
    }

    let escalated_posts: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE status = 'escalated'",
        [],
        |r| r.get(0),
    )?;

    Ok(Json(json!({
        "byStatus": by_status,
        "pendingByCategory": pending_by_category,
        "escalatedPosts": escalated_posts,
    })))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct NotesBody {
    staff_notes: Option<String>,
}

async fn dismiss_report(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<i64>,
    body: Option<Json<NotesBody>>,
) -> AppResult<Json<serde_json::Value>> {
    let notes = body.and_then(|Json(b)| b.staff_notes);
    resolve_report(
        &state,
        &admin,
        id,
        ReportStatus::Dismissed,
        notes.as_deref(),
        ModerationAction::ReportDismissed,
    )?;
    Ok(Json(json!({ "id": id, "status": ReportStatus::Dismissed })))
}

async fn review_report(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<i64>,
    body: Option<Json<NotesBody>>,
) -> AppResult<Json<serde_json::Value>> {
    let notes = body.and_then(|Json(b)| b.staff_notes);
    resolve_report(
        &state,
        &admin,
        id,
        ReportStatus::Reviewed,
        notes.as_deref(),
        ModerationAction::ReportReviewed,
    )?;
    Ok(Json(json!({ "id": id, "status": ReportStatus::Reviewed })))
}

/// Resolve a single report without touching its post. Re-resolving is
/// not guarded; resolved_at moves forward.
fn resolve_report(
    state: &AppState,
    admin: &AdminPrincipal,
    report_id: i64,
    status: ReportStatus,
    notes: Option<&str>,
    action: ModerationAction,
) -> AppResult<()> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let post_id: i64 = tx
        .query_row(
            "SELECT post_id FROM reports WHERE id = ?1",
            params![report_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(AppError::NotFound)?;
    tx.execute(
        "UPDATE reports SET status = ?1, staff_notes = ?2, resolved_by = ?3,
         resolved_at = datetime('now') WHERE id = ?4",
        params![status, notes, admin.actor(), report_id],
    )?;
    tx.commit()?;

    modlog::append(&conn, post_id, action, admin.actor(), notes);
    Ok(())
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ActionBody {
    action: String,
    staff_notes: Option<String>,
}

/// Act on the post through one of its reports. Resolves every other
/// pending report on the same post so staff never handle it twice.
async fn action_report(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Path(id): Path<i64>,
    body: Option<Json<ActionBody>>,
) -> AppResult<Json<serde_json::Value>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let (post_status, action_tag) = match body.action.as_str() {
        "approve" => (PostStatus::Approved, ModerationAction::ReportActionApprove),
        "reject" => (PostStatus::Rejected, ModerationAction::ReportActionReject),
        other => {
            return Err(AppError::Validation(format!(
                "action must be approve or reject, got '{other}'"
            )))
        }
    };

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let post_id: i64 = tx
        .query_row(
            "SELECT post_id FROM reports WHERE id = ?1",
            params![id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(AppError::NotFound)?;
    tx.execute(
        "UPDATE posts SET status = ?1 WHERE id = ?2",
        params![post_status, post_id],
    )?;
    tx.execute(
        "UPDATE reports SET status = ?1, staff_notes = ?2, resolved_by = ?3,
         resolved_at = datetime('now') WHERE id = ?4",
        params![ReportStatus::Actioned, body.staff_notes, admin.actor(), id],
    )?;
    tx.execute(
        "UPDATE reports SET status = ?1, staff_notes = ?2, resolved_by = ?3,
         resolved_at = datetime('now')
         WHERE post_id = ?4 AND status = 'pending' AND id != ?5",
        params![
            ReportStatus::Actioned,
            format!("auto-resolved by action on report #{id}"),
            admin.actor(),
            post_id,
            id,
        ],
    )?;
    tx.commit()?;

    modlog::append(
        &conn,
        post_id,
        action_tag,
        admin.actor(),
        body.staff_notes.as_deref(),
    );

    Ok(Json(json!({
        "reportId": id,
        "reportStatus": ReportStatus::Actioned,
        "postId": post_id,
        "postStatus": post_status,
    })))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct BulkBody {
    report_ids: Vec<serde_json::Value>,
    action: String,
    staff_notes: Option<String>,
}

/// Batched dismiss/review. Bulk deliberately cannot approve or reject
/// posts; that path stays one report at a time.
async fn bulk_resolve(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    Json(body): Json<BulkBody>,
) -> AppResult<Json<serde_json::Value>> {
    let (status, action_tag) = match body.action.as_str() {
        "dismiss" => (ReportStatus::Dismissed, ModerationAction::ReportBulkDismiss),
        "reviewed" => (ReportStatus::Reviewed, ModerationAction::ReportBulkReviewed),
        other => {
            return Err(AppError::Validation(format!(
                "action must be dismiss or reviewed, got '{other}'"
            )))
        }
    };

    // Anything that is not a positive integer is dropped, not an error;
    // an empty remainder is.
    let ids: Vec<i64> = body
        .report_ids
        .iter()
        .filter_map(|v| v.as_i64())
        .filter(|id| *id > 0)
        .collect();
    if ids.is_empty() {
        return Err(AppError::Validation("no valid report ids".into()));
    }

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let affected: Vec<(i64, i64)> = {
        let placeholders = (1..=ids.len())
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = tx.prepare(&format!(
            "SELECT id, post_id FROM reports WHERE id IN ({placeholders})"
        ))?;
        let bind: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
        let rows = stmt
            .query_map(&bind[..], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let updated = {
        let placeholders = (3..ids.len() + 3)
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE reports SET status = ?1, staff_notes = ?2, resolved_by = '{}',
             resolved_at = datetime('now') WHERE id IN ({placeholders})",
            admin.actor()
        );
        let mut bind: Vec<&dyn ToSql> = vec![&status, &body.staff_notes];
        for id in &ids {
            bind.push(id);
        }
        tx.execute(&sql, &bind[..])?
    };
    tx.commit()?;

    for (_, post_id) in &affected {
        modlog::append(
            &conn,
            *post_id,
            action_tag,
            admin.actor(),
            body.staff_notes.as_deref(),
        );
    }

    Ok(Json(json!({ "updated": updated, "status": status })))
}
