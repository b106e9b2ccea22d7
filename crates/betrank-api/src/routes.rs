use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::{require_admin, require_auth};
use crate::{categories, labels, online, rankings, shares, sites, suggestions, votes};

/// The full HTTP surface: public reads, signed-in actions, admin tools.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/categories", get(categories::list_categories))
        .route("/categories/{category_id}/ranking", get(rankings::category_ranking))
        .route("/sites", get(sites::list_sites))
        .route("/sites/{site_id}", get(sites::get_site))
        .route("/labels", get(labels::list_labels))
        .route("/rankings", get(rankings::list_rankings))
        .route("/rankings/{ranking_id}", get(rankings::get_ranking))
        .route("/shared/{token}", get(shares::shared_ranking))
        .route("/online", get(online::online_count))
        .route("/online/heartbeat", post(online::heartbeat));

    let user_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        .route("/rankings/{ranking_id}/votes", post(votes::cast_vote))
        .route("/rankings/{ranking_id}/votes/remaining", get(votes::remaining_votes))
        .route("/rankings/{ranking_id}/share", post(shares::share_ranking))
        .route("/suggestions", post(suggestions::create_suggestion))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Later route_layer wraps the earlier one, so auth runs before the admin check.
    let admin_routes = Router::new()
        .route("/api/generate-ranking", post(rankings::generate_ranking))
        .route("/admin/rankings/generate-all", post(rankings::generate_all))
        .route("/admin/categories", post(categories::create_category))
        .route(
            "/admin/categories/{category_id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route("/admin/categories/{category_id}/move", post(categories::move_category))
        .route(
            "/admin/categories/{category_id}/config",
            get(categories::get_ranking_config).put(categories::put_ranking_config),
        )
        .route("/admin/sites", post(sites::create_site))
        .route("/admin/sites/export", get(sites::export_sites))
        .route("/admin/sites/import", post(sites::import_sites))
        .route("/admin/sites/{site_id}", put(sites::update_site).delete(sites::delete_site))
        .route("/admin/labels", post(labels::create_label))
        .route("/admin/labels/{label_id}", put(labels::update_label).delete(labels::delete_label))
        .route("/admin/suggestions", get(suggestions::list_suggestions))
        .route("/admin/suggestions/{suggestion_id}", delete(suggestions::delete_suggestion))
        .route("/admin/suggestions/{suggestion_id}/approve", post(suggestions::approve_suggestion))
        .route("/admin/suggestions/{suggestion_id}/reject", post(suggestions::reject_suggestion))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
