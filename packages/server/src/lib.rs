pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod execution;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gauntlet API",
        version = "1.0.0",
        description = "API for the Gauntlet timed pattern-coding assessment"
    ),
    paths(
        handlers::session::login,
        handlers::session::update_progress,
        handlers::session::finish,
        handlers::session::disqualify,
        handlers::execute::execute,
        handlers::leaderboard::leaderboard,
        handlers::settings::get_settings,
        handlers::settings::update_setting,
        handlers::pattern::list_active_patterns,
        handlers::pattern::list_patterns,
        handlers::pattern::create_pattern,
        handlers::pattern::delete_pattern,
        handlers::admin::login,
        handlers::admin::list_participants,
        handlers::admin::delete_participant,
    ),
    tags(
        (name = "Session", description = "Participant session lifecycle"),
        (name = "Execution", description = "Code execution through the bounded queues"),
        (name = "Leaderboard", description = "Ranked session standings"),
        (name = "Settings", description = "System settings"),
        (name = "Patterns", description = "Pattern catalog"),
        (name = "Admin", description = "Administrative endpoints"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "admin_token",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allow_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    axum::Router::new()
        .nest("/api", routes::api_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state)
}
