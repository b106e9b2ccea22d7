use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use betrank_core::csv::{self, CATEGORY_SEPARATOR, SiteRecord};
use betrank_db::models::{SiteFields, SiteRow};
use betrank_types::api::{Claims, ImportResponse, SiteRequest, SiteResponse};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::run_db;

const MAX_NAME_LEN: usize = 100;

pub async fn list_sites(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, |db| db.list_sites()).await?;
    Ok(Json(rows.into_iter().map(convert::site).collect::<Vec<SiteResponse>>()))
}

pub async fn get_site(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_db(&state, move |db| db.get_site(&site_id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("Site"))?;
    Ok(Json(convert::site(row)))
}

pub async fn create_site(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SiteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = site_fields(req)?;
    let site_id = Uuid::new_v4().to_string();

    let sid = site_id.clone();
    let creator = claims.sub.to_string();
    let row = run_db(&state, move |db| {
        db.insert_site(&sid, &fields, Some(&creator))?;
        db.get_site(&sid)
    })
    .await?
    .ok_or(ApiError::NotFound("Site"))?;

    info!("{} created site '{}'", claims.username, row.name);
    Ok((StatusCode::CREATED, Json(convert::site(row))))
}

pub async fn update_site(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Json(req): Json<SiteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = site_fields(req)?;
    let sid = site_id.to_string();
    let row = run_db(&state, move |db| {
        if !db.update_site(&sid, &fields)? {
            return Ok(None);
        }
        db.get_site(&sid)
    })
    .await?
    .ok_or(ApiError::NotFound("Site"))?;

    Ok(Json(convert::site(row)))
}

pub async fn delete_site(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = run_db(&state, move |db| db.delete_site(&site_id.to_string())).await?;
    if !deleted {
        return Err(ApiError::NotFound("Site"));
    }
    info!("Deleted site {}", site_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_sites(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, |db| db.list_sites()).await?;
    let records: Vec<SiteRecord> = rows.into_iter().map(site_record).collect();
    let body = csv::write_sites(&records);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"betting-sites.csv\""),
        ],
        body,
    ))
}

/// Upsert sites from a CSV body. Row-level problems come back in `errors`;
/// only a missing header or an empty file fails the request.
pub async fn import_sites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let parsed = csv::parse_sites(&body)?;

    let mut errors = parsed.errors;
    let mut records = Vec::with_capacity(parsed.records.len());
    for (line_no, record) in parsed.records {
        match checked_record(record) {
            Ok(record) => records.push((line_no, record)),
            Err(e) => errors.push(format!("Row {line_no}: {e}")),
        }
    }

    let creator = claims.sub.to_string();
    let report = run_db(&state, move |db| db.import_sites(&records, Some(&creator))).await?;
    errors.extend(report.errors);

    info!(
        "{} imported sites: {} created, {} updated",
        claims.username, report.created, report.updated
    );
    Ok(Json(ImportResponse {
        created: report.created,
        updated: report.updated,
        errors,
    }))
}

fn site_fields(req: SiteRequest) -> Result<SiteFields, ApiError> {
    check_amount("commission", req.commission)?;
    check_amount("ltv", req.ltv)?;

    Ok(SiteFields {
        name: check_name(&req.name)?,
        url: check_url(&req.url)?,
        description: req.description.trim().to_string(),
        logo_url: req.logo_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
        categories: clean_names(req.categories, check_category_name)?,
        labels: clean_names(req.labels, check_name)?,
        commission: req.commission,
        ltv: req.ltv,
    })
}

/// Hold an imported row to the same rules as `POST /admin/sites`.
fn checked_record(record: SiteRecord) -> Result<SiteRecord, ApiError> {
    check_amount("commission", record.commission)?;
    check_amount("ltv", record.ltv)?;

    Ok(SiteRecord {
        name: check_name(&record.name)?,
        url: check_url(&record.url)?,
        description: record.description.trim().to_string(),
        categories: clean_names(record.categories, check_category_name)?,
        commission: record.commission,
        ltv: record.ltv,
    })
}

/// Names must survive a CSV export, which is line-based.
pub(crate) fn check_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest(format!("Name must be 1 to {MAX_NAME_LEN} characters")));
    }
    if name.chars().any(char::is_control) {
        return Err(ApiError::BadRequest("Name cannot contain control characters".into()));
    }
    Ok(name.to_string())
}

/// `|` separates categories in the CSV layout.
pub(crate) fn check_category_name(raw: &str) -> Result<String, ApiError> {
    let name = check_name(raw)?;
    if name.contains(CATEGORY_SEPARATOR) {
        return Err(ApiError::BadRequest(format!(
            "Category name '{name}' cannot contain '{CATEGORY_SEPARATOR}'"
        )));
    }
    Ok(name)
}

pub(crate) fn check_url(raw: &str) -> Result<String, ApiError> {
    let url = raw.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ApiError::BadRequest("URL must start with http:// or https://".into()));
    }
    Ok(url.to_string())
}

fn check_amount(field: &str, value: Option<f64>) -> Result<(), ApiError> {
    if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
        return Err(ApiError::BadRequest(format!("{field} must be a non-negative number")));
    }
    Ok(())
}

/// Trim, drop blanks and duplicates, keep first-seen order.
fn clean_names(
    names: Vec<String>,
    check: fn(&str) -> Result<String, ApiError>,
) -> Result<Vec<String>, ApiError> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if name.trim().is_empty() {
            continue;
        }
        let name = check(&name)?;
        if !out.contains(&name) {
            out.push(name);
        }
    }
    Ok(out)
}

fn site_record(row: SiteRow) -> SiteRecord {
    SiteRecord {
        name: row.name,
        url: row.url,
        description: row.description,
        categories: row.categories,
        commission: row.commission,
        ltv: row.ltv,
    }
}
