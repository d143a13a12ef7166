use rusqlite::{params, Connection};

use crate::db::models::ModerationAction;

/// Append an audit entry for a state-changing action.
///
/// Best-effort: the append runs after the owning transaction has
/// committed, and a failure is logged and swallowed so it can never undo
/// the state change it records.
pub fn append(
    conn: &Connection,
    post_id: i64,
    action: ModerationAction,
    actor: &str,
    reason: Option<&str>,
) {
    let result = conn.execute(
        "INSERT INTO moderation_log (post_id, action, admin, reason) VALUES (?1, ?2, ?3, ?4)",
        params![post_id, action.as_str(), actor, reason],
    );
    if let Err(e) = result {
        tracing::warn!(
            post_id,
            action = action.as_str(),
            "moderation log append failed: {}",
            e
        );
    }
}
