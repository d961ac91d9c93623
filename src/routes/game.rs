use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::game::{
        CurrentGameResponse, GameHistoryDto, ShootRequest, ShootResponse, StartGameRequest,
        StartGameResponse,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Player-facing game endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/groups/{group_id}/games", post(start_game))
        .route("/groups/{group_id}/games/current", get(current_game))
        .route("/groups/{group_id}/games/current/shots", post(shoot))
        .route("/groups/{group_id}/games/{game_id}", get(game_history))
}

/// Start a game. Refusals (game running, daily cap, cooldown) come back with `success = false`.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/games",
    tag = "games",
    params(("group_id" = String, Path, description = "Chat group identifier")),
    request_body = StartGameRequest,
    responses(
        (status = 200, description = "Start outcome", body = StartGameResponse),
        (status = 400, description = "Malformed identifier or body")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(group_id): Path<String>,
    Valid(Json(request)): Valid<Json<StartGameRequest>>,
) -> Result<Json<StartGameResponse>, AppError> {
    Ok(Json(
        game_service::start_game(&state, &group_id, request).await?,
    ))
}

/// Inspect the running game.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/games/current",
    tag = "games",
    params(("group_id" = String, Path, description = "Chat group identifier")),
    responses((status = 200, description = "Running game, if any", body = CurrentGameResponse))
)]
pub async fn current_game(
    State(state): State<SharedState>,
    Path(group_id): Path<String>,
) -> Result<Json<CurrentGameResponse>, AppError> {
    Ok(Json(game_service::current_game(&state, &group_id).await?))
}

/// Pull the trigger.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/games/current/shots",
    tag = "games",
    params(("group_id" = String, Path, description = "Chat group identifier")),
    request_body = ShootRequest,
    responses(
        (status = 200, description = "Shot outcome, with the settlement when the game ended", body = ShootResponse),
        (status = 400, description = "Malformed identifier or body")
    )
)]
pub async fn shoot(
    State(state): State<SharedState>,
    Path(group_id): Path<String>,
    Valid(Json(request)): Valid<Json<ShootRequest>>,
) -> Result<Json<ShootResponse>, AppError> {
    Ok(Json(game_service::shoot(&state, &group_id, request).await?))
}

/// Retrieve a finished game.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/games/{game_id}",
    tag = "games",
    params(
        ("group_id" = String, Path, description = "Chat group identifier"),
        ("game_id" = String, Path, description = "Identifier returned when the game started")
    ),
    responses(
        (status = 200, description = "Archived game", body = GameHistoryDto),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn game_history(
    State(state): State<SharedState>,
    Path((group_id, game_id)): Path<(String, String)>,
) -> Result<Json<GameHistoryDto>, AppError> {
    Ok(Json(
        game_service::game_history(&state, &group_id, &game_id).await?,
    ))
}
