use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the store and report whether it is usable.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.store().health_check().await {
        Ok(()) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded()
        }
    }
}
