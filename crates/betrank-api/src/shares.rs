use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use betrank_core::sharing::generate_sharing_token;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use betrank_types::api::{Claims, ShareResponse};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::run_db;

pub async fn share_ranking(
    State(state): State<AppState>,
    Path(ranking_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let share_id = Uuid::new_v4().to_string();
    let token = generate_sharing_token(&mut rand::rng());
    let ttl = state.settings.share_ttl;

    let rid = ranking_id.to_string();
    let uid = claims.sub.to_string();
    let row = run_db(&state, move |db| {
        db.create_share(&share_id, &rid, Some(&uid), &token, Utc::now(), ttl)
    })
    .await?
    .ok_or(ApiError::NotFound("Ranking"))?;

    info!("{} shared ranking {}", claims.username, ranking_id);
    Ok((
        StatusCode::CREATED,
        Json(ShareResponse {
            expires_at: convert::timestamp(&row.expires_at, "share expires_at"),
            token: row.token,
        }),
    ))
}

/// Public view of a shared ranking. Expired links read as missing.
pub async fn shared_ranking(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = run_db(&state, move |db| db.resolve_share(&token, Utc::now()))
        .await?
        .ok_or(ApiError::NotFound("Shared ranking"))?;
    Ok(Json(convert::ranking(snapshot)))
}
