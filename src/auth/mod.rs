pub mod password;
pub mod token;

use rusqlite::{params, OptionalExtension};

use crate::db::models::Role;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Look up a user with the given role by email, check the password, and
/// issue a signed token. Every failure path is InvalidCredentials-shaped:
/// the caller learns nothing about which step failed.
pub fn login(state: &AppState, email: &str, password_input: &str, role: Role) -> AppResult<String> {
    let conn = state.db.get()?;

    let row: Option<(i64, Option<String>)> = conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE email = ?1 AND role = ?2",
            params![email, role],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    let (user_id, stored_hash) = row.ok_or(AppError::Unauthorized)?;

    let hash = match stored_hash {
        Some(h) => h,
        None if state.config.auth.allow_password_bootstrap => {
            // Demo accounts are seeded without a password; the first
            // login claims one.
            let h = password::hash(password_input)?;
            conn.execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2 AND password_hash IS NULL",
                params![h, user_id],
            )?;
            tracing::info!(user_id, "password bootstrapped on first login");
            h
        }
        None => return Err(AppError::Unauthorized),
    };

    if !password::verify(password_input, &hash) {
        return Err(AppError::Unauthorized);
    }

    token::issue(
        &state.config.auth.jwt_secret,
        user_id,
        email,
        role,
        state.config.auth.token_hours,
    )
}
