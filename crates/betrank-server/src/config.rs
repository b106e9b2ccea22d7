use std::{env, fmt::Display, str::FromStr};

use anyhow::{Context, Result, bail};
use betrank_api::auth::Settings;
use betrank_core::generation::GenerationParams;
use betrank_core::online::OrganicRange;
use tracing::info;

/// Secrets that ship in docs and samples and must never reach production.
const PLACEHOLDER_SECRETS: [&str; 3] = ["changeme", "change-me", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    /// `(username, password)` of the account promoted to admin at startup.
    pub admin: Option<(String, String)>,
    pub ranking_interval_secs: u64,
    pub generate_on_start: bool,
    pub settings: Settings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let jwt_secret = env::var("BETRANK_JWT_SECRET").context("BETRANK_JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.trim()) {
            bail!("BETRANK_JWT_SECRET is empty or a placeholder; set a real secret");
        }

        let admin = match (env::var("BETRANK_ADMIN_USERNAME"), env::var("BETRANK_ADMIN_PASSWORD")) {
            (Ok(user), Ok(pass)) if !user.trim().is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        };

        let ranking_defaults = GenerationParams::new(
            try_load("BETRANK_DEFAULT_SITE_COUNT", "10")?,
            try_load("BETRANK_DEFAULT_MIN_VOTES", "0")?,
            try_load("BETRANK_DEFAULT_MAX_VOTES", "100")?,
        )
        .context("Invalid default ranking parameters")?;

        let ranking_interval_secs: u64 = try_load("BETRANK_RANKING_INTERVAL_SECS", "86400")?;
        let online_window_secs: i64 = try_load("BETRANK_ONLINE_WINDOW_SECS", "300")?;
        let share_ttl_hours: i64 = try_load("BETRANK_SHARE_TTL_HOURS", "168")?;
        if ranking_interval_secs == 0 || online_window_secs <= 0 || share_ttl_hours <= 0 {
            bail!("Intervals, presence window and share TTL must be positive");
        }

        Ok(Self {
            host: try_load("BETRANK_HOST", "0.0.0.0")?,
            port: try_load("BETRANK_PORT", "3000")?,
            db_path: try_load("BETRANK_DB_PATH", "betrank.db")?,
            jwt_secret,
            admin,
            ranking_interval_secs,
            generate_on_start: try_load("BETRANK_GENERATE_ON_START", "false")?,
            settings: Settings {
                ranking_defaults,
                share_ttl: chrono::Duration::hours(share_ttl_hours),
                online_window: chrono::Duration::seconds(online_window_secs),
                organic: OrganicRange::new(
                    try_load("BETRANK_ORGANIC_MIN", "0")?,
                    try_load("BETRANK_ORGANIC_MAX", "0")?,
                ),
            },
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value '{raw}': {e}"))
}
