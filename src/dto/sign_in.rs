//! DTOs for the daily sign-in bonus.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::validate_identifier;

/// Payload used to sign a player in for the day.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignInRequest {
    /// Player signing in.
    #[validate(custom(function = "validate_identifier"))]
    pub player_id: String,
}

/// Reply to a sign-in attempt.
#[derive(Debug, Serialize, ToSchema)]
pub struct SignInResponse {
    /// Whether points were granted.
    pub success: bool,
    /// Text to post in the chat.
    pub message: String,
    /// Points granted by this sign-in, or by today's earlier one when refused as a repeat.
    pub points_awarded: Option<i64>,
    /// 1-based rank among today's sign-ins.
    pub order: Option<u32>,
    /// Player score after the bonus.
    pub total_score: Option<i64>,
}

impl SignInResponse {
    /// Refusal with the reason shown to the player.
    pub fn rejected(message: String, points_awarded: Option<i64>) -> Self {
        Self {
            success: false,
            message,
            points_awarded,
            order: None,
            total_score: None,
        }
    }
}
