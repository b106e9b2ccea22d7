use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use betrank_core::generation::GenerationParams;
use betrank_core::online::OrganicRange;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use betrank_db::Database;
use betrank_types::api::{
    ChangePasswordRequest, Claims, LoginRequest, LoginResponse, MeResponse, RegisterRequest,
    RegisterResponse,
};
use betrank_types::models::Role;

use crate::error::ApiError;
use crate::run_db;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub settings: Settings,
}

/// Tunables shared by the handlers and the background loops.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Used for categories without a stored ranking config.
    pub ranking_defaults: GenerationParams,
    pub share_ttl: chrono::Duration,
    pub online_window: chrono::Duration,
    pub organic: OrganicRange,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ranking_defaults: GenerationParams::default(),
            share_ttl: chrono::Duration::hours(168),
            online_window: chrono::Duration::seconds(300),
            organic: OrganicRange::default(),
        }
    }
}

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::BadRequest("Username must be 3 to 32 characters".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest("Password must be at least 8 characters".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    let uid = user_id.to_string();
    let name = username.clone();
    run_db(&state, move |db| {
        db.create_profile(&uid, &name, &password_hash, Role::User.as_str())
    })
    .await
    .map_err(|e| match e {
        ApiError::Conflict(_) => ApiError::Conflict("Username is already taken".into()),
        other => other,
    })?;

    let token = create_token(&state.jwt_secret, user_id, &username, Role::User)?;
    info!("Registered user {}", username);

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let profile = run_db(&state, move |db| db.get_profile_by_username(&username))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    verify_password(&req.password, &profile.password)?;

    let user_id: Uuid = profile
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt profile id '{}': {}", profile.id, e)))?;
    let role = parse_role(&profile.role);

    let token = create_token(&state.jwt_secret, user_id, &profile.username, role)?;

    Ok(Json(LoginResponse {
        user_id,
        username: profile.username,
        role,
        token,
    }))
}

/// The session user with the role merged in from the profile row.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let profile = run_db(&state, move |db| db.get_profile_by_id(&uid))
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let role = parse_role(&profile.role);

    Ok(Json(MeResponse {
        user_id: claims.sub,
        username: profile.username,
        role,
        is_admin: role.is_admin(),
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest("Password must be at least 8 characters".into()));
    }

    let uid = claims.sub.to_string();
    let profile = run_db(&state, move |db| db.get_profile_by_id(&uid))
        .await?
        .ok_or(ApiError::Unauthorized)?;
    verify_password(&req.current_password, &profile.password)?;

    let new_hash = hash_password(&req.new_password)?;
    run_db(&state, move |db| db.update_password(&profile.id, &new_hash)).await?;

    info!("Password changed for {}", claims.username);
    Ok(StatusCode::NO_CONTENT)
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> Result<(), ApiError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt password hash: {}", e)))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::InvalidCredentials)
}

fn parse_role(raw: &str) -> Role {
    raw.parse().unwrap_or_else(|e| {
        warn!("Profile has {}, treating as user", e);
        Role::User
    })
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str, role: Role) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| ApiError::Internal(e.into()))
}
