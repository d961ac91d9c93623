use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod game;
/// Health check payload.
pub mod health;
/// Leaderboard payloads.
pub mod ranking;
pub mod sign_in;
pub mod validation;

fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
