use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::sign_in::{SignInRequest, SignInResponse},
    error::AppError,
    services::sign_in_service,
    state::SharedState,
};

/// Sign-in endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/groups/{group_id}/sign-ins", post(sign_in))
}

/// Claim today's sign-in bonus.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/sign-ins",
    tag = "sign-in",
    params(("group_id" = String, Path, description = "Chat group identifier")),
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Sign-in outcome", body = SignInResponse),
        (status = 400, description = "Malformed identifier or body")
    )
)]
pub async fn sign_in(
    State(state): State<SharedState>,
    Path(group_id): Path<String>,
    Valid(Json(request)): Valid<Json<SignInRequest>>,
) -> Result<Json<SignInResponse>, AppError> {
    Ok(Json(
        sign_in_service::perform_sign_in(&state, &group_id, request).await?,
    ))
}
