//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dao::game_store::is_valid_key;

/// Validates that a group or player identifier can be used as a storage key:
/// 1 to 64 ASCII letters, digits, `_` or `-`.
///
/// # Examples
///
/// ```ignore
/// validate_identifier("player_42") // Ok
/// validate_identifier("../etc")    // Err - path characters
/// validate_identifier("")          // Err - empty
/// ```
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if is_valid_key(id) {
        return Ok(());
    }

    let mut err = ValidationError::new("identifier_format");
    err.message = Some(
        format!("`{id}` must be 1 to 64 characters among letters, digits, `_` and `-`").into(),
    );
    Err(err)
}
