use std::sync::LazyLock;

use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use regex::Regex;
use tracing::{debug, error, info, warn};

use nutrisaur_db::Database;
use nutrisaur_db::models::RegisterOutcome;
use nutrisaur_db::queries::LoginKey;
use nutrisaur_types::api::{
    ApiResponse, LoginData, LoginRequest, RegisterData, RegisterRequest, SessionClaims,
};
use nutrisaur_types::events::CommunityEvent;

use crate::error::ApiError;
use crate::session::{self, SESSION_COOKIE, SessionIdentity};
use crate::state::{AppState, blocking};

const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("valid e-mail pattern")
});

pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("password hashing failed: {}", e))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

enum LoginOutcome {
    NotFound,
    InvalidPassword,
    Authenticated(SessionIdentity),
}

/// Resolve a login identifier against `users` first, then `admin`.
fn authenticate(db: &Database, login: &str, password: &str) -> anyhow::Result<LoginOutcome> {
    let key = if is_valid_email(login) {
        LoginKey::Email
    } else {
        LoginKey::Username
    };

    if let Some(user) = db.get_user_by_login(login, key)? {
        if !verify_password(password, &user.password) {
            return Ok(LoginOutcome::InvalidPassword);
        }

        // A user sharing an e-mail with an admin row gets admin rights
        let admin = db.get_admin_by_login(&user.email, LoginKey::Email)?;
        db.touch_user_login(user.user_id)?;

        return Ok(LoginOutcome::Authenticated(SessionIdentity {
            user_id: Some(user.user_id),
            admin_id: admin.as_ref().map(|a| a.admin_id),
            is_admin: admin.is_some(),
            role: admin.map(|a| a.role),
            username: user.username,
            email: user.email,
        }));
    }

    if let Some(admin) = db.get_admin_by_login(login, key)? {
        if !verify_password(password, &admin.password) {
            return Ok(LoginOutcome::InvalidPassword);
        }
        db.touch_admin_login(admin.admin_id)?;

        return Ok(LoginOutcome::Authenticated(SessionIdentity {
            user_id: None,
            admin_id: Some(admin.admin_id),
            username: admin.username,
            email: admin.email,
            is_admin: true,
            role: Some(admin.role),
        }));
    }

    Ok(LoginOutcome::NotFound)
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let login = req.username.trim().to_string();

    if login.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation(
            "Please enter both username/email and password",
        ));
    }

    let password = req.password;
    let outcome = blocking(&state, move |s| authenticate(&s.db, &login, &password)).await?;

    let identity = match outcome {
        LoginOutcome::Authenticated(identity) => identity,
        LoginOutcome::InvalidPassword => return Err(ApiError::validation("Invalid password")),
        LoginOutcome::NotFound => return Err(ApiError::validation("User not found")),
    };

    if let Some(previous) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| session::decode_token(&state.session, c.value()).ok())
    {
        debug!("Replacing session {} on login", previous.sid);
    }

    let (claims, token) = session::issue(&state.session, identity).map_err(|e| {
        error!("Failed to sign session: {}", e);
        ApiError::Internal
    })?;
    info!(
        "{} logged in (admin: {}, session {})",
        claims.username, claims.is_admin, claims.sid
    );

    let data = LoginData {
        user_id: claims.user_id,
        admin_id: claims.admin_id,
        username: claims.username,
        email: claims.email,
        is_admin: claims.is_admin,
        role: claims.role,
    };

    Ok((
        jar.add(session::session_cookie(token)),
        Json(ApiResponse::ok_with_message("Login successful!", data)),
    ))
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Please fill in all fields"));
    }
    if !is_valid_email(&req.email) {
        return Err(ApiError::validation("Please enter a valid email address"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "Password must be at least 6 characters long",
        ));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(mut req) = payload?;
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_string();
    validate_registration(&req)?;

    let RegisterRequest {
        username,
        email,
        password,
    } = req;

    let outcome = blocking(&state, move |s| {
        let password_hash = hash_password(&password)?;
        s.db.register_user(&username, &email, &password_hash, |user_id| {
            let identity = SessionIdentity {
                user_id: Some(user_id),
                username: username.clone(),
                email: email.clone(),
                ..Default::default()
            };
            Ok(session::issue(&s.session, identity)?)
        })
    })
    .await?;

    let (user_id, (claims, token)) = match outcome {
        RegisterOutcome::Created { user_id, session } => (user_id, session),
        RegisterOutcome::Duplicate => {
            return Err(ApiError::validation("Username or email already exists"));
        }
    };
    info!("Registered user {} ({})", claims.username, user_id);

    state.dispatcher.broadcast(CommunityEvent::NewUserRegistered {
        barangay: String::new(),
        username: claims.username.clone(),
    });

    let data = RegisterData {
        user_id,
        username: claims.username,
        email: claims.email,
    };

    Ok((
        jar.add(session::session_cookie(token)),
        Json(ApiResponse::ok_with_message("Registration successful!", data)),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(session::removal_cookie()),
        Json(ApiResponse::<()> {
            success: true,
            message: Some("Logged out".to_string()),
            data: None,
        }),
    )
}

pub async fn current_session(Extension(claims): Extension<SessionClaims>) -> impl IntoResponse {
    Json(ApiResponse::ok(claims))
}

/// Create the bootstrap admin if no admin with `email` exists yet.
/// Returns whether a row was created.
pub fn ensure_admin(
    db: &Database,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<bool> {
    if db.get_admin_by_login(email, LoginKey::Email)?.is_some() {
        return Ok(false);
    }
    let password_hash = hash_password(password)?;
    db.create_admin(username, email, &password_hash, "admin")?;
    Ok(true)
}
