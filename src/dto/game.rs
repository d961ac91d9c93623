//! DTOs for starting, playing, ending and inspecting roulette games.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{format_timestamp, validation::validate_identifier},
    state::{
        game::{GameHistory, GameRecord, Participant},
        state_machine::{RuleViolation, Settlement, StartedGame},
    },
};

/// Payload used to start a game in a group.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartGameRequest {
    /// Player starting the game.
    #[validate(custom(function = "validate_identifier"))]
    pub initiator_id: String,
    /// Number of chambers; the configured default applies when omitted.
    #[serde(default)]
    pub chamber_count: Option<u32>,
}

/// Payload used to take a turn in the running game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ShootRequest {
    /// Player taking the turn.
    #[validate(custom(function = "validate_identifier"))]
    pub player_id: String,
    /// Wager for this turn; the configured default applies when omitted.
    #[serde(default)]
    pub bet: Option<i64>,
}

/// Reply to a start request.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartGameResponse {
    /// Whether the game was started.
    pub success: bool,
    /// Text to post in the chat.
    pub message: String,
    /// Identifier of the new game.
    pub game_id: Option<String>,
    /// Chambers in the cylinder.
    pub chamber_count: Option<u32>,
}

impl StartGameResponse {
    /// Refusal carrying the rule that was broken.
    pub fn rejected(violation: RuleViolation) -> Self {
        Self {
            success: false,
            message: violation.to_string(),
            game_id: None,
            chamber_count: None,
        }
    }
}

impl From<StartedGame> for StartGameResponse {
    fn from(value: StartedGame) -> Self {
        Self {
            success: true,
            message: format!(
                "Game {} started with {} chambers. Take your shots!",
                value.game_id, value.chamber_count
            ),
            game_id: Some(value.game_id),
            chamber_count: Some(value.chamber_count),
        }
    }
}

/// Reply to a shot.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShootResponse {
    /// Whether the shot was taken.
    pub success: bool,
    /// Text to post in the chat.
    pub message: String,
    /// Whether this shot ended the game.
    pub game_over: bool,
    /// Whether the shooter was hit.
    pub hit: bool,
    /// Zero-based position of this turn.
    pub turn_order: Option<u32>,
    /// Shots left before the cylinder is empty.
    pub shots_remaining: Option<u32>,
    /// Present when this shot ended the game.
    pub settlement: Option<SettlementSummary>,
}

impl ShootResponse {
    /// Refusal carrying the rule that was broken.
    pub fn rejected(violation: RuleViolation) -> Self {
        Self {
            success: false,
            message: violation.to_string(),
            game_over: false,
            hit: false,
            turn_order: None,
            shots_remaining: None,
            settlement: None,
        }
    }
}

/// Reply to an admin end request.
#[derive(Debug, Serialize, ToSchema)]
pub struct EndGameResponse {
    /// Whether a game was settled.
    pub success: bool,
    /// Text to post in the chat.
    pub message: String,
    /// Present when a game was settled.
    pub settlement: Option<SettlementSummary>,
}

impl EndGameResponse {
    /// Refusal carrying the rule that was broken.
    pub fn rejected(violation: RuleViolation) -> Self {
        Self {
            success: false,
            message: violation.to_string(),
            settlement: None,
        }
    }
}

impl From<Settlement> for EndGameResponse {
    fn from(value: Settlement) -> Self {
        Self {
            success: true,
            message: value.summary.clone(),
            settlement: Some(value.into()),
        }
    }
}

/// Score change of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScoreDelta {
    /// Participant.
    pub player_id: String,
    /// Points won (positive) or lost.
    pub delta: i64,
}

fn score_deltas(deltas: IndexMap<String, i64>) -> Vec<ScoreDelta> {
    deltas
        .into_iter()
        .map(|(player_id, delta)| ScoreDelta { player_id, delta })
        .collect()
}

/// Outcome of a settled game.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettlementSummary {
    /// Settled game.
    pub game_id: String,
    /// `hit` or `all_safe`.
    pub outcome: String,
    /// Participant who was hit, if any.
    pub hit_player_id: Option<String>,
    /// Multi-line recap suitable for posting in the chat.
    pub summary: String,
    /// Deltas in turn order.
    pub score_deltas: Vec<ScoreDelta>,
}

impl From<Settlement> for SettlementSummary {
    fn from(value: Settlement) -> Self {
        Self {
            game_id: value.game_id,
            outcome: value.outcome.as_str().to_string(),
            hit_player_id: value.hit_player_id,
            summary: value.summary,
            score_deltas: score_deltas(value.score_deltas),
        }
    }
}

/// One turn of a game.
#[derive(Debug, Serialize, ToSchema)]
pub struct TurnDto {
    /// Shooter.
    pub player_id: String,
    /// Zero-based position in the shooting sequence.
    pub turn_order: u32,
    /// Points wagered per chamber.
    pub bet: i64,
    /// Whether the shot fired the live round.
    pub was_hit: bool,
    /// RFC 3339 timestamp.
    pub shot_at: String,
}

fn turns(participants: IndexMap<String, Participant>) -> Vec<TurnDto> {
    participants
        .into_iter()
        .map(|(player_id, participant)| TurnDto {
            player_id,
            turn_order: participant.turn_order,
            bet: participant.bet,
            was_hit: participant.was_hit,
            shot_at: format_timestamp(participant.shot_at),
        })
        .collect()
}

/// State of the running game. Whether a live round is loaded stays hidden.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSnapshot {
    /// Running game.
    pub game_id: String,
    /// Player who started it.
    pub initiator_id: String,
    /// RFC 3339 timestamp.
    pub started_at: String,
    /// Chambers in the cylinder.
    pub chamber_count: u32,
    /// Shots taken so far.
    pub shots_fired: u32,
    /// Shots left before the cylinder is empty.
    pub shots_remaining: u32,
    /// Turns taken, in order.
    pub turns: Vec<TurnDto>,
}

impl From<GameRecord> for GameSnapshot {
    fn from(value: GameRecord) -> Self {
        let shots_remaining = value.remaining_chambers();
        Self {
            game_id: value.id,
            initiator_id: value.initiator_id,
            started_at: format_timestamp(value.started_at),
            chamber_count: value.chamber_count,
            shots_fired: value.shots_fired,
            shots_remaining,
            turns: turns(value.participants),
        }
    }
}

/// Reply to a current game lookup.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentGameResponse {
    /// Whether a game is running.
    pub running: bool,
    /// Snapshot of the running game.
    pub game: Option<GameSnapshot>,
}

impl From<Option<GameRecord>> for CurrentGameResponse {
    fn from(value: Option<GameRecord>) -> Self {
        Self {
            running: value.is_some(),
            game: value.map(Into::into),
        }
    }
}

/// Archived record of a finished game.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameHistoryDto {
    /// Settled game.
    pub game_id: String,
    /// RFC 3339 timestamp.
    pub started_at: String,
    /// RFC 3339 timestamp.
    pub ended_at: String,
    /// Player who started the game.
    pub initiator_id: String,
    /// Chambers in the cylinder.
    pub chamber_count: u32,
    /// Whether a live round was loaded.
    pub bullet_present: bool,
    /// Whether the live round was fired.
    pub bullet_discharged: bool,
    /// Shots taken before settlement.
    pub shots_fired: u32,
    /// `hit` or `all_safe`.
    pub outcome: String,
    /// Participant who was hit, if any.
    pub hit_player_id: Option<String>,
    /// Turns, in order.
    pub turns: Vec<TurnDto>,
    /// Deltas in turn order.
    pub score_deltas: Vec<ScoreDelta>,
}

impl From<GameHistory> for GameHistoryDto {
    fn from(value: GameHistory) -> Self {
        Self {
            game_id: value.id,
            started_at: format_timestamp(value.started_at),
            ended_at: format_timestamp(value.ended_at),
            initiator_id: value.initiator_id,
            chamber_count: value.chamber_count,
            bullet_present: value.bullet_present,
            bullet_discharged: value.bullet_discharged,
            shots_fired: value.shots_fired,
            outcome: value.outcome.as_str().to_string(),
            hit_player_id: value.hit_player_id,
            turns: turns(value.participants),
            score_deltas: score_deltas(value.score_deltas),
        }
    }
}
