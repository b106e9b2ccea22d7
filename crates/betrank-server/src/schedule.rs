use std::time::Duration;

use betrank_api::auth::AppState;
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Regenerate every category's ranking on a fixed interval.
///
/// The first tick of a tokio interval fires immediately; it is skipped unless
/// `generate_on_start` is set.
pub async fn run_ranking_loop(state: AppState, interval_secs: u64, generate_on_start: bool) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if !generate_on_start {
        interval.tick().await;
    }

    loop {
        interval.tick().await;

        let worker = state.clone();
        let result = tokio::task::spawn_blocking(move || {
            let defaults = worker.settings.ranking_defaults;
            worker.db.regenerate_all_rankings(&defaults, Utc::now(), &mut rand::rng())
        })
        .await;

        match result {
            Ok(Ok(report)) => {
                for (category_id, reason) in &report.failed {
                    warn!("Scheduled ranking for {} failed: {}", category_id, reason);
                }
                info!("Scheduled rankings: {} generated", report.generated.len());
            }
            Ok(Err(e)) => warn!("Scheduled ranking run failed: {:#}", e),
            Err(e) => warn!("Scheduled ranking task panicked: {}", e),
        }
    }
}

/// Drop presence rows that fell out of the online window.
pub async fn run_presence_prune_loop(state: AppState) {
    let window = state.settings.online_window;
    let period = window.to_std().unwrap_or(Duration::from_secs(300));
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        let worker = state.clone();
        let result = tokio::task::spawn_blocking(move || worker.db.prune_online_users(Utc::now() - window)).await;

        match result {
            Ok(Ok(removed)) if removed > 0 => info!("Presence: pruned {} stale sessions", removed),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Presence prune error: {}", e),
            Err(e) => warn!("Presence prune task panicked: {}", e),
        }
    }
}
