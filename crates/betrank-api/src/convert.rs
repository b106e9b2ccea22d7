//! Row → wire conversions. Corrupt ids or timestamps are logged and replaced
//! with defaults rather than failing the whole listing.

use betrank_db::models::{
    CategoryRow, LabelRow, RankedSiteRow, RankingSnapshot, SiteRow, SuggestionRow,
};
use betrank_db::time::parse_ts;
use betrank_types::api::{
    CategoryResponse, LabelResponse, RankedSiteResponse, RankingResponse, SiteResponse,
    SuggestionResponse,
};
use betrank_types::models::SuggestionStatus;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

pub(crate) fn uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn opt_uuid(raw: Option<&str>, what: &str) -> Option<Uuid> {
    raw.map(|r| uuid(r, what))
}

pub(crate) fn timestamp(raw: &str, what: &str) -> DateTime<Utc> {
    parse_ts(raw).unwrap_or_else(|| {
        warn!("Corrupt {} '{}'", what, raw);
        DateTime::default()
    })
}

pub fn site(row: SiteRow) -> SiteResponse {
    SiteResponse {
        id: uuid(&row.id, "site id"),
        created_by: opt_uuid(row.created_by.as_deref(), "site created_by"),
        created_at: timestamp(&row.created_at, "site created_at"),
        name: row.name,
        url: row.url,
        description: row.description,
        logo_url: row.logo_url,
        categories: row.categories,
        labels: row.labels,
        commission: row.commission,
        ltv: row.ltv,
    }
}

pub fn category(row: CategoryRow) -> CategoryResponse {
    CategoryResponse {
        id: uuid(&row.id, "category id"),
        created_by: opt_uuid(row.created_by.as_deref(), "category created_by"),
        created_at: timestamp(&row.created_at, "category created_at"),
        name: row.name,
        description: row.description,
        position: row.position,
    }
}

pub fn label(row: LabelRow) -> LabelResponse {
    LabelResponse {
        id: uuid(&row.id, "label id"),
        created_by: opt_uuid(row.created_by.as_deref(), "label created_by"),
        created_at: timestamp(&row.created_at, "label created_at"),
        name: row.name,
        color: row.color,
    }
}

pub fn suggestion(row: SuggestionRow) -> SuggestionResponse {
    let status = row.status.parse().unwrap_or_else(|e| {
        warn!("Suggestion {}: {}", row.id, e);
        SuggestionStatus::Pending
    });
    SuggestionResponse {
        id: uuid(&row.id, "suggestion id"),
        suggested_by: opt_uuid(row.suggested_by.as_deref(), "suggested_by"),
        created_at: timestamp(&row.created_at, "suggestion created_at"),
        name: row.name,
        url: row.url,
        description: row.description,
        status,
    }
}

pub fn ranking(snapshot: RankingSnapshot) -> RankingResponse {
    let RankingSnapshot { ranking, entries } = snapshot;
    RankingResponse {
        id: uuid(&ranking.id, "ranking id"),
        category_id: uuid(&ranking.category_id, "ranking category_id"),
        generated_at: timestamp(&ranking.generated_at, "generated_at"),
        expires_at: timestamp(&ranking.expires_at, "expires_at"),
        category_name: ranking.category_name,
        sites: entries.into_iter().map(ranked_site).collect(),
    }
}

fn ranked_site(row: RankedSiteRow) -> RankedSiteResponse {
    RankedSiteResponse {
        site_id: uuid(&row.site_id, "ranked site id"),
        name: row.site_name,
        url: row.site_url,
        logo_url: row.site_logo_url,
        description: row.site_description,
        votes: row.votes,
        position: row.position,
    }
}
