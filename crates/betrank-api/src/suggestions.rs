use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use betrank_db::suggestions::Approval;
use betrank_types::api::{Claims, SuggestionRequest, SuggestionResponse};
use betrank_types::models::SuggestionStatus;

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::run_db;
use crate::sites::{check_name, check_url};

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    pub status: Option<SuggestionStatus>,
}

pub async fn create_suggestion(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SuggestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = check_name(&req.name)?;
    let url = check_url(&req.url)?;
    let description = req.description.trim().to_string();
    let suggestion_id = Uuid::new_v4().to_string();

    let sid = suggestion_id.clone();
    let author = claims.sub.to_string();
    let row = run_db(&state, move |db| {
        db.insert_suggestion(&sid, &name, &url, &description, Some(&author))?;
        db.get_suggestion(&sid)
    })
    .await?
    .ok_or(ApiError::NotFound("Suggestion"))?;

    info!("{} suggested '{}'", claims.username, row.name);
    Ok((StatusCode::CREATED, Json(convert::suggestion(row))))
}

pub async fn list_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, move |db| db.list_suggestions(query.status)).await?;
    Ok(Json(rows.into_iter().map(convert::suggestion).collect::<Vec<SuggestionResponse>>()))
}

/// Approve a suggestion, listing the site if it is not listed yet.
pub async fn approve_suggestion(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(suggestion_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let sid = suggestion_id.to_string();
    let approver = claims.sub.to_string();
    let row = run_db(&state, move |db| {
        let Some(approval) = db.approve_suggestion(&sid, Some(&approver))? else {
            return Ok(None);
        };
        if let Approval::AlreadyListed(site_id) = &approval {
            info!("Suggestion {} matches existing site {}", sid, site_id);
        }
        db.get_suggestion(&sid)
    })
    .await?
    .ok_or(ApiError::NotFound("Suggestion"))?;

    Ok(Json(convert::suggestion(row)))
}

pub async fn reject_suggestion(
    State(state): State<AppState>,
    Path(suggestion_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let sid = suggestion_id.to_string();
    let row = run_db(&state, move |db| {
        if !db.set_suggestion_status(&sid, SuggestionStatus::Rejected)? {
            return Ok(None);
        }
        db.get_suggestion(&sid)
    })
    .await?
    .ok_or(ApiError::NotFound("Suggestion"))?;

    Ok(Json(convert::suggestion(row)))
}

pub async fn delete_suggestion(
    State(state): State<AppState>,
    Path(suggestion_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = run_db(&state, move |db| db.delete_suggestion(&suggestion_id.to_string())).await?;
    if !deleted {
        return Err(ApiError::NotFound("Suggestion"));
    }
    Ok(StatusCode::NO_CONTENT)
}
