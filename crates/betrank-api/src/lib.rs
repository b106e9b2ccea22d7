pub mod auth;
pub mod categories;
pub mod convert;
pub mod error;
pub mod labels;
pub mod middleware;
pub mod online;
pub mod rankings;
pub mod routes;
pub mod shares;
pub mod sites;
pub mod suggestions;
pub mod votes;

use betrank_db::Database;
use tracing::error;

use crate::auth::AppState;
use crate::error::ApiError;

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::from)
}
