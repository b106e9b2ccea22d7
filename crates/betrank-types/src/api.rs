use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MoveDirection, Role, SuggestionStatus};

// -- JWT Claims --

/// Session claims carried in the bearer token. The role is informational;
/// admin checks re-read it from the profile row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// -- Sites --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteRequest {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub logo_url: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub commission: Option<f64>,
    pub ltv: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SiteResponse {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub categories: Vec<String>,
    pub labels: Vec<String>,
    pub commission: Option<f64>,
    pub ltv: Option<f64>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

// -- Categories --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub position: i64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoveCategoryRequest {
    pub direction: MoveDirection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RankingConfigRequest {
    pub site_count: i64,
    pub min_votes: i64,
    pub max_votes: i64,
}

#[derive(Debug, Serialize)]
pub struct RankingConfigResponse {
    pub category_id: Uuid,
    pub site_count: i64,
    pub min_votes: i64,
    pub max_votes: i64,
    /// False when no row is stored and the server defaults apply.
    pub customized: bool,
}

// -- Labels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelRequest {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Serialize)]
pub struct LabelResponse {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// -- Suggestions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuggestionRequest {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub description: String,
    pub suggested_by: Option<Uuid>,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
}

// -- Rankings --

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateRankingRequest {
    pub category_id: Uuid,
    pub site_count: i64,
    pub min_votes: i64,
    pub max_votes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateRankingResponse {
    pub ranking_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BatchFailure {
    pub category_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub generated: Vec<GenerateRankingResponse>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Serialize)]
pub struct RankedSiteResponse {
    pub site_id: Uuid,
    pub name: String,
    pub url: String,
    pub logo_url: Option<String>,
    pub description: String,
    pub votes: i64,
    pub position: i64,
}

#[derive(Debug, Serialize)]
pub struct RankingResponse {
    pub id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub sites: Vec<RankedSiteResponse>,
}

// -- Votes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub site_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub site_id: Uuid,
    pub votes: i64,
    pub remaining_votes: u32,
}

#[derive(Debug, Serialize)]
pub struct RemainingVotesResponse {
    pub ranking_id: Uuid,
    pub remaining_votes: u32,
}

// -- Sharing --

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// -- Presence --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct OnlineResponse {
    pub count: u64,
}
