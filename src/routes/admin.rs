use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::post,
};

use crate::{
    dto::game::EndGameResponse, error::AppError, services::game_service, state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/admin/groups/{group_id}/games/current/end",
            post(end_game),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Settle the running game with nobody hit, whatever the number of shots fired.
#[utoipa::path(
    post,
    path = "/admin/groups/{group_id}/games/current/end",
    tag = "admin",
    params(
        ("X-Admin-Token" = String, Header, description = "Token configured through ROULETTE_ADMIN_TOKEN"),
        ("group_id" = String, Path, description = "Chat group identifier")
    ),
    responses(
        (status = 200, description = "End outcome with the settlement", body = EndGameResponse),
        (status = 401, description = "Missing or wrong admin token")
    )
)]
pub async fn end_game(
    State(state): State<SharedState>,
    Path(group_id): Path<String>,
) -> Result<Json<EndGameResponse>, AppError> {
    Ok(Json(game_service::admin_end_game(&state, &group_id).await?))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    match state.config().admin_token.as_deref() {
        Some(expected) if expected == provided.as_str() => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "admin routes are disabled (no admin token configured)".into(),
        )),
    }
}
