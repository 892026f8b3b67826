use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification of the quiz engine.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::room_stream,
        crate::routes::rooms::start_round,
        crate::routes::rooms::end_round,
        crate::routes::rooms::end_song,
        crate::routes::rooms::buzz,
        crate::routes::rooms::answer,
        crate::routes::rooms::pause_game,
        crate::routes::rooms::resume_game,
        crate::routes::rooms::end_game,
        crate::routes::rooms::player_disconnect,
        crate::routes::rooms::player_reconnect,
        crate::routes::rooms::teardown_room,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::StartRoundRequest,
            crate::dto::room::BuzzRequestBody,
            crate::dto::room::AnswerRequest,
            crate::dto::room::RoundSummary,
            crate::dto::room::BuzzResponse,
            crate::dto::room::AnswerResponse,
            crate::dto::room::ActionResponse,
            crate::dto::sse::RoomHandshake,
            crate::modes::BuzzRejection,
            crate::modes::ModeKind,
            crate::modes::params::GameplayParams,
            crate::state::game::AnswerType,
            crate::state::game::FinalScore,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "rooms", description = "Round and song lifecycle of a room"),
        (name = "players", description = "Player connectivity"),
    )
)]
/// OpenAPI document covering every route of the engine.
pub struct ApiDoc;
