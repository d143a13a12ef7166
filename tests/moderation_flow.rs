mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;

#[tokio::test]
async fn parent_approves_linked_childs_post() {
    let app = spawn();
    let id = create_post(&app.router, "T", Some("child@local")).await;

    let token = parent_token(&app.router).await;

    // The post is waiting on this parent
    let (status, body) = send(&app.router, bearer_get("/api/parents/me/pending", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let pending = body.as_array().unwrap();
    assert!(pending.iter().any(|p| p["id"] == id));

    let (status, body) = send(
        &app.router,
        bearer_post_empty(&format!("/api/parents/me/posts/{id}/approve"), &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["status"], "approved");

    // Now public
    let (_, body) = send(&app.router, get("/api/posts")).await;
    assert!(body.as_array().unwrap().iter().any(|p| p["id"] == id));

    // parent_approved_by records the acting parent
    let conn = app.state.db.get().unwrap();
    let (status_col, approved_by): (String, i64) = conn
        .query_row(
            "SELECT status, parent_approved_by FROM posts WHERE id = ?1",
            rusqlite::params![id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(status_col, "approved");
    let parent_id: i64 = conn
        .query_row(
            "SELECT id FROM users WHERE email = 'parent@local'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(approved_by, parent_id);
}

#[tokio::test]
async fn parent_cannot_touch_unlinked_posts() {
    let app = spawn();
    let token = parent_token(&app.router).await;

    // Anonymous author: no link can exist
    let anon = create_post(&app.router, "Anon", None).await;
    let (status, _) = send(
        &app.router,
        bearer_post_empty(&format!("/api/parents/me/posts/{anon}/approve"), &token),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Authored by a user the parent is not linked to
    let other = create_post(&app.router, "Other", Some("admin@local")).await;
    let (status, _) = send(
        &app.router,
        bearer_post_empty(&format!("/api/parents/me/posts/{other}/reject"), &token),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Unknown post is 404, not 403
    let (status, _) = send(
        &app.router,
        bearer_post_empty("/api/parents/me/posts/9999/approve", &token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn parent_reject_is_logged_with_reason() {
    let app = spawn();
    let id = create_post(&app.router, "Doubtful", Some("child@local")).await;
    let token = parent_token(&app.router).await;

    let (status, body) = send(
        &app.router,
        bearer_post_json(
            &format!("/api/parents/me/posts/{id}/reject"),
            &token,
            &json!({ "reason": "not age appropriate" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    let conn = app.state.db.get().unwrap();
    let (action, actor, reason): (String, String, Option<String>) = conn
        .query_row(
            "SELECT action, admin, reason FROM moderation_log WHERE post_id = ?1",
            rusqlite::params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(action, "parent-reject");
    assert_eq!(actor, "parent@local");
    assert_eq!(reason.as_deref(), Some("not age appropriate"));
}

#[tokio::test]
async fn parent_endpoints_reject_bad_tokens() {
    let app = spawn();

    let (status, _) = send(&app.router, get("/api/parents/me/pending")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app.router,
        bearer_get("/api/parents/me/pending", "garbage.token.here"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn parents_see_their_linked_children() {
    let app = spawn();
    let token = parent_token(&app.router).await;

    let (status, body) = send(&app.router, bearer_get("/api/parents/me/children", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let children = body.as_array().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["email"], "child@local");
    assert_eq!(children[0]["role"], "user");
}

#[tokio::test]
async fn admin_moderates_without_relationship_check() {
    let app = spawn();
    let id = create_post(&app.router, "Anon", None).await;

    let (status, _) = send(
        &app.router,
        post_empty(&format!("/api/moderation/{id}/approve")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app.router,
        admin_post_empty(&format!("/api/moderation/{id}/approve")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    // Backward transition is allowed: reject the approved post
    let (status, body) = send(
        &app.router,
        admin_post_json(
            &format!("/api/moderation/{id}/reject"),
            &json!({ "reason": "second thoughts" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    let (status, _) = send(&app.router, admin_post_empty("/api/moderation/9999/approve")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let conn = app.state.db.get().unwrap();
    let actions: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT action FROM moderation_log WHERE post_id = ?1 ORDER BY id")
            .unwrap();
        stmt.query_map(rusqlite::params![id], |r| r.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    };
    assert_eq!(actions, vec!["approve", "reject"]);
}

#[tokio::test]
async fn admin_pending_and_escalated_listings() {
    let app = spawn();
    let pending = create_post(&app.router, "Waiting", None).await;
    let escalated = create_post(&app.router, "Flagged", None).await;
    admin_approve(&app.router, escalated).await;
    let (status, _) = send(
        &app.router,
        post_json(
            &format!("/api/posts/{escalated}/report"),
            &json!({ "reasonCategory": "spam" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&app.router, admin_get("/api/moderation/pending")).await;
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&pending));
    assert!(ids.contains(&escalated));

    let (_, body) = send(&app.router, admin_get("/api/moderation/escalated")).await;
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![escalated]);
}

#[tokio::test]
async fn any_report_escalates_whatever_the_status() {
    let app = spawn();
    let id = create_post(&app.router, "T", Some("child@local")).await;
    admin_approve(&app.router, id).await;

    let (status, body) = send(
        &app.router,
        post_json(
            &format!("/api/posts/{id}/report"),
            &json!({ "reasonCategory": "spam", "reason": "looks like an ad" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["escalated"], true);
    assert_eq!(body["reasonCategory"], "spam");

    let (_, body) = send(&app.router, admin_get("/api/moderation/reports?status=pending")).await;
    let reports = body.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["postId"], id);
    assert_eq!(reports[0]["postStatus"], "escalated");

    // A rejected post escalates too
    let (status, _) = send(
        &app.router,
        admin_post_empty(&format!("/api/moderation/{id}/reject")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, _) = send(
        &app.router,
        post_json(&format!("/api/posts/{id}/report"), &json!({})),
    )
    .await;

    let conn = app.state.db.get().unwrap();
    let post_status: String = conn
        .query_row(
            "SELECT status FROM posts WHERE id = ?1",
            rusqlite::params![id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(post_status, "escalated");
}

#[tokio::test]
async fn reporting_a_missing_post_is_404() {
    let app = spawn();
    let (status, _) = send(
        &app.router,
        post_json("/api/posts/777/report", &json!({ "reasonCategory": "spam" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn action_on_one_report_resolves_the_posts_other_pending_reports() {
    let app = spawn();
    let id = create_post(&app.router, "Twice flagged", Some("child@local")).await;
    let other_post = create_post(&app.router, "Unrelated", None).await;

    let report = |category: &str, post: i64| {
        post_json(
            &format!("/api/posts/{post}/report"),
            &json!({ "reasonCategory": category }),
        )
    };
    let (_, first) = send(&app.router, report("inappropriate", id)).await;
    let (_, _second) = send(&app.router, report("inaccurate", id)).await;
    let (_, unrelated) = send(&app.router, report("spam", other_post)).await;
    let first_id = first["reportId"].as_i64().unwrap();
    let unrelated_id = unrelated["reportId"].as_i64().unwrap();

    let (status, body) = send(
        &app.router,
        admin_post_json(
            &format!("/api/moderation/reports/{first_id}/action"),
            &json!({ "action": "reject", "staffNotes": "verified problem" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reportStatus"], "actioned");
    assert_eq!(body["postId"], id);
    assert_eq!(body["postStatus"], "rejected");

    // Both reports on the post are now actioned
    let (_, body) = send(
        &app.router,
        admin_get(&format!("/api/moderation/posts/{id}/reports")),
    )
    .await;
    let reports = body.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r["status"] == "actioned"));
    // The sibling carries a note pointing at the acting report
    assert!(reports
        .iter()
        .any(|r| r["staffNotes"]
            .as_str()
            .map(|n| n.contains(&format!("#{first_id}")))
            .unwrap_or(false)));

    // The unrelated post's report is untouched
    let (_, body) = send(
        &app.router,
        admin_get(&format!("/api/moderation/reports/{unrelated_id}")),
    )
    .await;
    assert_eq!(body["status"], "pending");

    // Approve path through a report
    let (status, body) = send(
        &app.router,
        admin_post_json(
            &format!("/api/moderation/reports/{unrelated_id}/action"),
            &json!({ "action": "approve" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["postStatus"], "approved");

    let (status, _) = send(
        &app.router,
        admin_post_json(
            &format!("/api/moderation/reports/{unrelated_id}/action"),
            &json!({ "action": "delete" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
