use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use betrank_core::online::{displayed_online_count, generate_organic_value};
use chrono::Utc;

use betrank_types::api::{HeartbeatRequest, OnlineResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::decode_bearer;
use crate::run_db;

const MAX_SESSION_ID_LEN: usize = 128;

/// Anonymous heartbeats are fine; a valid bearer token ties the session to
/// its user.
pub async fn heartbeat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<HeartbeatRequest>,
) -> Result<StatusCode, ApiError> {
    let session_id = req.session_id.trim().to_string();
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
        return Err(ApiError::BadRequest("Invalid session_id".into()));
    }

    let user_id = decode_bearer(&headers, &state.jwt_secret)
        .ok()
        .map(|claims| claims.sub.to_string());

    run_db(&state, move |db| {
        db.touch_online_user(&session_id, user_id.as_deref(), Utc::now())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Live sessions inside the presence window plus the organic offset.
pub async fn online_count(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let since = Utc::now() - state.settings.online_window;
    let active = run_db(&state, move |db| db.count_online_users(since)).await?;
    let organic = generate_organic_value(state.settings.organic, &mut rand::rng());

    Ok(Json(OnlineResponse {
        count: displayed_online_count(active, organic),
    }))
}
