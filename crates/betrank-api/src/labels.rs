use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use betrank_types::api::{Claims, LabelRequest, LabelResponse};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::run_db;
use crate::sites::check_name;

pub async fn list_labels(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, |db| db.list_labels()).await?;
    Ok(Json(rows.into_iter().map(convert::label).collect::<Vec<LabelResponse>>()))
}

pub async fn create_label(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<LabelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (name, color) = label_fields(&req)?;
    let label_id = Uuid::new_v4().to_string();

    let creator = claims.sub.to_string();
    let row = run_db(&state, move |db| {
        db.insert_label(&label_id, &name, &color, Some(&creator))?;
        db.get_label(&label_id)
    })
    .await?
    .ok_or(ApiError::NotFound("Label"))?;

    Ok((StatusCode::CREATED, Json(convert::label(row))))
}

pub async fn update_label(
    State(state): State<AppState>,
    Path(label_id): Path<Uuid>,
    Json(req): Json<LabelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (name, color) = label_fields(&req)?;

    let lid = label_id.to_string();
    let row = run_db(&state, move |db| {
        if !db.update_label(&lid, &name, &color)? {
            return Ok(None);
        }
        db.get_label(&lid)
    })
    .await?
    .ok_or(ApiError::NotFound("Label"))?;

    Ok(Json(convert::label(row)))
}

pub async fn delete_label(
    State(state): State<AppState>,
    Path(label_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = run_db(&state, move |db| db.delete_label(&label_id.to_string())).await?;
    if !deleted {
        return Err(ApiError::NotFound("Label"));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn label_fields(req: &LabelRequest) -> Result<(String, String), ApiError> {
    let name = check_name(&req.name)?;
    let color = req.color.trim();
    if !is_hex_color(color) {
        return Err(ApiError::BadRequest("Color must be a hex value like #1A2B3C".into()));
    }
    Ok((name, color.to_ascii_uppercase()))
}

fn is_hex_color(raw: &str) -> bool {
    raw.strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_six_digit_hex() {
        assert!(is_hex_color("#00ff7A"));
        assert!(!is_hex_color("00ff7A"));
        assert!(!is_hex_color("#fff"));
        assert!(!is_hex_color("#gg0000"));
    }
}
