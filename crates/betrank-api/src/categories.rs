use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use betrank_core::generation::GenerationParams;
use tracing::info;
use uuid::Uuid;

use betrank_types::api::{
    CategoryRequest, CategoryResponse, Claims, MoveCategoryRequest, RankingConfigRequest,
    RankingConfigResponse,
};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::run_db;
use crate::sites::check_category_name;

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, |db| db.list_categories()).await?;
    Ok(Json(rows.into_iter().map(convert::category).collect::<Vec<CategoryResponse>>()))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = check_category_name(&req.name)?;
    let description = req.description.trim().to_string();
    let category_id = Uuid::new_v4().to_string();

    let cid = category_id.clone();
    let creator = claims.sub.to_string();
    let row = run_db(&state, move |db| {
        db.insert_category(&cid, &name, &description, Some(&creator))?;
        db.get_category(&cid)
    })
    .await?
    .ok_or(ApiError::NotFound("Category"))?;

    info!("{} created category '{}'", claims.username, row.name);
    Ok((StatusCode::CREATED, Json(convert::category(row))))
}

/// Rename or re-describe a category; sites tagged with the old name follow.
pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = check_category_name(&req.name)?;
    let description = req.description.trim().to_string();

    let cid = category_id.to_string();
    let row = run_db(&state, move |db| {
        if !db.update_category(&cid, &name, &description)? {
            return Ok(None);
        }
        db.get_category(&cid)
    })
    .await?
    .ok_or(ApiError::NotFound("Category"))?;

    Ok(Json(convert::category(row)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = run_db(&state, move |db| db.delete_category(&category_id.to_string())).await?;
    if !deleted {
        return Err(ApiError::NotFound("Category"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Move a category one slot. Moving past either end leaves the order as is.
pub async fn move_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(req): Json<MoveCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cid = category_id.to_string();
    let rows = run_db(&state, move |db| {
        if db.get_category(&cid)?.is_none() {
            return Ok(None);
        }
        db.move_category(&cid, req.direction)?;
        db.list_categories().map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("Category"))?;

    Ok(Json(rows.into_iter().map(convert::category).collect::<Vec<CategoryResponse>>()))
}

pub async fn get_ranking_config(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cid = category_id.to_string();
    let stored = run_db(&state, move |db| {
        if db.get_category(&cid)?.is_none() {
            return Ok(None);
        }
        db.get_ranking_config(&cid).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("Category"))?;

    let response = match stored {
        Some(cfg) => RankingConfigResponse {
            category_id,
            site_count: cfg.site_count,
            min_votes: cfg.min_votes,
            max_votes: cfg.max_votes,
            customized: true,
        },
        None => config_response(category_id, &state.settings.ranking_defaults, false),
    };
    Ok(Json(response))
}

pub async fn put_ranking_config(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(req): Json<RankingConfigRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let params = GenerationParams::new(req.site_count, req.min_votes, req.max_votes)?;

    let cid = category_id.to_string();
    let found = run_db(&state, move |db| {
        if db.get_category(&cid)?.is_none() {
            return Ok(false);
        }
        db.upsert_ranking_config(&cid, &params)?;
        Ok(true)
    })
    .await?;
    if !found {
        return Err(ApiError::NotFound("Category"));
    }

    info!("Ranking config for {} set to {:?}", category_id, params);
    Ok(Json(config_response(category_id, &params, true)))
}

fn config_response(category_id: Uuid, params: &GenerationParams, customized: bool) -> RankingConfigResponse {
    RankingConfigResponse {
        category_id,
        site_count: i64::from(params.site_count()),
        min_votes: i64::from(params.votes().min()),
        max_votes: i64::from(params.votes().max()),
        customized,
    }
}
