use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the number of games being played.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let active_games = state.store().active_game_count();
    debug!(active_games, "health check");
    HealthResponse::ok(active_games)
}
