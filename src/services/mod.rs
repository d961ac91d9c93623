use crate::{dao::game_store::is_valid_key, error::ServiceError};

/// Document loading with default-and-persist recovery.
mod documents;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game lifecycle: start, shoot, admin end and lookups.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Group leaderboard.
pub mod ranking_service;
/// Daily sign-in bonus.
pub mod sign_in_service;

/// Reject identifiers that cannot be used as storage keys.
fn ensure_identifier(kind: &str, value: &str) -> Result<(), ServiceError> {
    if is_valid_key(value) {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "{kind} `{value}` must be 1 to 64 characters among letters, digits, `_` and `-`"
        )))
    }
}
