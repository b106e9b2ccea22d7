use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use betrank_core::generation::GenerationParams;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use betrank_types::api::{
    BatchFailure, BatchResponse, GenerateRankingRequest, GenerateRankingResponse, RankingResponse,
};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::run_db;

/// Newest ranking of every category.
pub async fn list_rankings(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let snapshots = run_db(&state, |db| db.list_latest_rankings()).await?;
    Ok(Json(snapshots.into_iter().map(convert::ranking).collect::<Vec<RankingResponse>>()))
}

pub async fn get_ranking(
    State(state): State<AppState>,
    Path(ranking_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = run_db(&state, move |db| db.get_ranking(&ranking_id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("Ranking"))?;
    Ok(Json(convert::ranking(snapshot)))
}

pub async fn category_ranking(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = run_db(&state, move |db| db.latest_ranking_for_category(&category_id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("Ranking"))?;
    Ok(Json(convert::ranking(snapshot)))
}

/// Generate a ranking for one category with explicit parameters.
///
/// Malformed bodies are answered with the same `{message}` shape as every
/// other failure.
pub async fn generate_ranking(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRankingRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let params = GenerationParams::new(req.site_count, req.min_votes, req.max_votes)?;

    let cid = req.category_id.to_string();
    let ranking_id = run_db(&state, move |db| {
        db.generate_daily_ranking(&cid, &params, Utc::now(), &mut rand::rng())
    })
    .await?
    .ok_or(ApiError::NotFound("Category"))?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateRankingResponse {
            ranking_id: convert::uuid(&ranking_id, "ranking id"),
        }),
    ))
}

/// Regenerate every category using its stored config or the server defaults.
pub async fn generate_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let defaults = state.settings.ranking_defaults;
    let report = run_db(&state, move |db| {
        db.regenerate_all_rankings(&defaults, Utc::now(), &mut rand::rng())
    })
    .await?;

    info!(
        "Manual batch run: {} generated, {} failed",
        report.generated.len(),
        report.failed.len()
    );
    Ok(Json(BatchResponse {
        generated: report
            .generated
            .iter()
            .map(|(_, ranking_id)| GenerateRankingResponse {
                ranking_id: convert::uuid(ranking_id, "ranking id"),
            })
            .collect(),
        failed: report
            .failed
            .into_iter()
            .map(|(category_id, message)| BatchFailure {
                category_id: convert::uuid(&category_id, "category id"),
                message,
            })
            .collect(),
    }))
}
