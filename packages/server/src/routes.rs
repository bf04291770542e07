use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::session::login))
        .route("/update-progress", post(handlers::session::update_progress))
        .route("/finish", post(handlers::session::finish))
        .route("/disqualify", post(handlers::session::disqualify))
        .route("/execute", post(handlers::execute::execute))
        .route("/leaderboard", get(handlers::leaderboard::leaderboard))
        .route(
            "/settings",
            get(handlers::settings::get_settings).post(handlers::settings::update_setting),
        )
        .route("/patterns", get(handlers::pattern::list_active_patterns))
        .nest("/admin", admin_routes())
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::admin::login))
        .route(
            "/patterns",
            get(handlers::pattern::list_patterns).post(handlers::pattern::create_pattern),
        )
        .route("/patterns/{id}", delete(handlers::pattern::delete_pattern))
        .route("/participants", get(handlers::admin::list_participants))
        .route(
            "/participants/{lot_number}",
            delete(handlers::admin::delete_participant),
        )
}
