/// Database row types. These map directly to SQLite rows and are distinct
/// from the betrank-types wire models to keep the DB layer independent.

pub struct ProfileRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct SiteRow {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub categories: Vec<String>,
    pub labels: Vec<String>,
    pub commission: Option<f64>,
    pub ltv: Option<f64>,
    pub created_by: Option<String>,
    pub created_at: String,
}

/// Editable columns of a betting site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteFields {
    pub name: String,
    pub url: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub categories: Vec<String>,
    pub labels: Vec<String>,
    pub commission: Option<f64>,
    pub ltv: Option<f64>,
}

pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub position: i64,
    pub created_by: Option<String>,
    pub created_at: String,
}

pub struct LabelRow {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_by: Option<String>,
    pub created_at: String,
}

pub struct SuggestionRow {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub suggested_by: Option<String>,
    pub status: String,
    pub created_at: String,
}

pub struct RankingConfigRow {
    pub category_id: String,
    pub site_count: i64,
    pub min_votes: i64,
    pub max_votes: i64,
    pub updated_at: String,
}

pub struct RankingRow {
    pub id: String,
    pub category_id: String,
    pub category_name: String,
    pub generated_at: String,
    pub expires_at: String,
}

pub struct RankedSiteRow {
    pub site_id: String,
    pub site_name: String,
    pub site_url: String,
    pub site_logo_url: Option<String>,
    pub site_description: String,
    pub votes: i64,
    /// Current standing, renumbered on read.
    pub position: i64,
}

/// A ranking header together with its entries in standing order.
pub struct RankingSnapshot {
    pub ranking: RankingRow,
    pub entries: Vec<RankedSiteRow>,
}

pub struct SharedRankingRow {
    pub id: String,
    pub ranking_id: String,
    pub shared_by: Option<String>,
    pub token: String,
    pub shared_at: String,
    pub expires_at: String,
}
