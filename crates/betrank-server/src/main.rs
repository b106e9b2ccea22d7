mod config;
mod schedule;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use betrank_api::auth::{AppStateInner, hash_password};
use betrank_api::routes::build_router;
use betrank_db::Database;
use betrank_types::models::Role;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "betrank=debug,betrank_api=debug,betrank_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::load()?;

    let db = Database::open(&PathBuf::from(&config.db_path))?;
    if let Some((username, password)) = &config.admin {
        seed_admin(&db, username, password)?;
    }

    let state = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        settings: config.settings.clone(),
    });

    tokio::spawn(schedule::run_ranking_loop(
        state.clone(),
        config.ranking_interval_secs,
        config.generate_on_start,
    ));
    tokio::spawn(schedule::run_presence_prune_loop(state.clone()));

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("betrank listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Make sure the configured account exists and holds the admin role. An
/// existing account keeps its password.
fn seed_admin(db: &Database, username: &str, password: &str) -> anyhow::Result<()> {
    match db.get_profile_by_username(username)? {
        Some(profile) => {
            if profile.role != Role::Admin.as_str() {
                db.set_role(&profile.id, Role::Admin.as_str())?;
                info!("Promoted '{}' to admin", username);
            }
        }
        None => {
            let hash = hash_password(password)?;
            db.create_profile(&Uuid::new_v4().to_string(), username, &hash, Role::Admin.as_str())?;
            info!("Created admin account '{}'", username);
        }
    }
    Ok(())
}
