use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Endpoints behind the admin token.
pub mod admin;
/// Start, shoot and game lookups.
pub mod game;
/// Liveness check endpoint.
pub mod health;
/// Group leaderboard.
pub mod ranking;
/// Daily sign-in.
pub mod sign_in;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(game::router())
        .merge(ranking::router())
        .merge(sign_in::router())
        .merge(admin::router(state.clone()));

    let docs_router: Router<SharedState> = SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", ApiDoc::openapi())
        .into();

    api_router.merge(docs_router).with_state(state)
}
