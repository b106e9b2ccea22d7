use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use betrank_db::votes::{VoteOutcome, Voter};
use betrank_types::api::{Claims, RemainingVotesResponse, VoteRequest, VoteResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;

/// Cast one vote for a site in a ranking.
///
/// Up to three votes per ranking per UTC day, at most one per site per
/// category per day.
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(ranking_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ip = client_ip(&headers);
    let vote_id = Uuid::new_v4().to_string();
    let rid = ranking_id.to_string();
    let sid = req.site_id.to_string();
    let uid = claims.sub.to_string();

    let outcome = run_db(&state, move |db| {
        let voter = Voter {
            user_id: &uid,
            ip: ip.as_deref(),
        };
        db.register_vote(&vote_id, &rid, &sid, voter, Utc::now())
    })
    .await?;

    match outcome {
        VoteOutcome::Recorded { votes, remaining } => {
            info!("{} voted for {} in ranking {}", claims.username, req.site_id, ranking_id);
            Ok(Json(VoteResponse {
                site_id: req.site_id,
                votes,
                remaining_votes: remaining,
            }))
        }
        VoteOutcome::Rejected(rejection) => Err(rejection.into()),
    }
}

pub async fn remaining_votes(
    State(state): State<AppState>,
    Path(ranking_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let rid = ranking_id.to_string();
    let uid = claims.sub.to_string();
    let remaining = run_db(&state, move |db| {
        if db.get_ranking(&rid)?.is_none() {
            return Ok(None);
        }
        db.votes_remaining(&rid, &uid, Utc::now()).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("Ranking"))?;

    Ok(Json(RemainingVotesResponse {
        ranking_id,
        remaining_votes: remaining,
    }))
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.9"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
