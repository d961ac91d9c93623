use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::ranking::RankingResponse, error::AppError, services::ranking_service, state::SharedState,
};

/// Leaderboard endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/groups/{group_id}/ranking", get(get_ranking))
}

/// Leaderboard of the group.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/ranking",
    tag = "ranking",
    params(("group_id" = String, Path, description = "Chat group identifier")),
    responses((status = 200, description = "Players by descending score", body = RankingResponse))
)]
pub async fn get_ranking(
    State(state): State<SharedState>,
    Path(group_id): Path<String>,
) -> Result<Json<RankingResponse>, AppError> {
    Ok(Json(ranking_service::get_ranking(&state, &group_id).await?))
}
