use utoipa::OpenApi;

/// Aggregated OpenAPI specification for Roulette Back.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::start_game,
        crate::routes::game::current_game,
        crate::routes::game::shoot,
        crate::routes::game::game_history,
        crate::routes::admin::end_game,
        crate::routes::ranking::get_ranking,
        crate::routes::sign_in::sign_in,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::StartGameRequest,
            crate::dto::game::StartGameResponse,
            crate::dto::game::ShootRequest,
            crate::dto::game::ShootResponse,
            crate::dto::game::EndGameResponse,
            crate::dto::game::SettlementSummary,
            crate::dto::game::ScoreDelta,
            crate::dto::game::TurnDto,
            crate::dto::game::GameSnapshot,
            crate::dto::game::CurrentGameResponse,
            crate::dto::game::GameHistoryDto,
            crate::dto::ranking::RankingEntry,
            crate::dto::ranking::RankingResponse,
            crate::dto::sign_in::SignInRequest,
            crate::dto::sign_in::SignInResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Starting, playing and inspecting games"),
        (name = "admin", description = "Operations reserved to group administrators"),
        (name = "ranking", description = "Group leaderboard"),
        (name = "sign-in", description = "Daily sign-in bonus"),
    )
)]
pub struct ApiDoc;
