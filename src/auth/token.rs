use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::models::Role;
use crate::error::{AppError, AppResult};

/// Claims carried by a parent/user token. Self-contained: the server
/// keeps no session table, so a token is trusted until expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue(secret: &str, user_id: i64, email: &str, role: Role, hours: u64) -> AppResult<String> {
    let now = Utc::now();
    issue_at(secret, user_id, email, role, now.timestamp(), (now + Duration::hours(hours as i64)).timestamp())
}

fn issue_at(
    secret: &str,
    user_id: i64,
    email: &str,
    role: Role,
    iat: i64,
    exp: i64,
) -> AppResult<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        iat,
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Verify signature and expiry. Malformed, expired, or wrongly signed
/// tokens all fail closed as Unauthorized.
pub fn verify(secret: &str, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}
