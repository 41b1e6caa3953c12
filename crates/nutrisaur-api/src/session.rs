use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use nutrisaur_types::api::SessionClaims;

pub const SESSION_COOKIE: &str = "nutrisaur_session";

#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl: chrono::Duration,
}

/// Who a new session belongs to. `sid` and `exp` are filled in by `issue`.
#[derive(Debug, Clone, Default)]
pub struct SessionIdentity {
    pub user_id: Option<i64>,
    pub admin_id: Option<i64>,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub role: Option<String>,
}

/// Sign a new session. Every call gets a fresh `sid`, so a token presented
/// before login is never carried over.
pub fn issue(
    config: &SessionConfig,
    identity: SessionIdentity,
) -> Result<(SessionClaims, String), jsonwebtoken::errors::Error> {
    let exp = (chrono::Utc::now() + config.ttl).timestamp() as usize;
    let claims = SessionClaims {
        sid: Uuid::new_v4(),
        user_id: identity.user_id,
        admin_id: identity.admin_id,
        username: identity.username,
        email: identity.email,
        is_admin: identity.is_admin,
        role: identity.role,
        exp,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;
    Ok((claims, token))
}

pub fn decode_token(
    config: &SessionConfig,
    token: &str,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Session token from the cookie, falling back to `Authorization: Bearer`.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
