use rusqlite::params;

use crate::auth::password;
use crate::config::Config;
use crate::state::DbPool;

/// Idempotent startup seeding: an admin account always, and the demo
/// parent/child pair (plus their link) when `[seed] demo` is on.
pub fn run(pool: &DbPool, config: &Config) -> anyhow::Result<()> {
    let conn = pool.get()?;

    conn.execute(
        "INSERT OR IGNORE INTO users (email, display_name, role, parental_consent)
         VALUES ('admin@local', 'admin', 'admin', 1)",
        [],
    )?;

    if !config.seed.demo {
        return Ok(());
    }

    let have_parent: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = 'parent@local'",
        [],
        |r| r.get(0),
    )?;
    if !have_parent {
        let hash = password::hash(&config.seed.parent_password)?;
        conn.execute(
            "INSERT INTO users (email, display_name, role, parental_consent, password_hash)
             VALUES ('parent@local', 'Parent Local', 'parent', 1, ?1)",
            params![hash],
        )?;
        tracing::info!("Seeded parent user: parent@local");
    }

    conn.execute(
        "INSERT OR IGNORE INTO users (email, display_name, role, parental_consent)
         VALUES ('child@local', 'Child Local', 'user', 0)",
        [],
    )?;

    let parent_id: i64 = conn.query_row(
        "SELECT id FROM users WHERE email = 'parent@local'",
        [],
        |r| r.get(0),
    )?;
    let child_id: i64 = conn.query_row(
        "SELECT id FROM users WHERE email = 'child@local'",
        [],
        |r| r.get(0),
    )?;

    // The unique constraint makes this safe to re-run.
    conn.execute(
        "INSERT OR IGNORE INTO parent_child (parent_user_id, child_user_id) VALUES (?1, ?2)",
        params![parent_id, child_id],
    )?;

    Ok(())
}
