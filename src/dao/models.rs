use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Per-group document holding the daily counter and the current game slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupGameEntity {
    /// Number of games settled on `last_reset_date`.
    #[serde(default)]
    pub daily_games_ended: u32,
    /// UTC+8 calendar date (`YYYY-MM-DD`) the counter refers to.
    #[serde(default)]
    pub last_reset_date: Option<String>,
    /// Game currently running in the group, if any.
    #[serde(default)]
    pub current_game: Option<GameEntity>,
    /// Score changes of a settled game not yet credited to every player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_payout: Option<PendingPayoutEntity>,
}

/// Credits owed after a settlement, kept until every player document is updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingPayoutEntity {
    /// Settled game the credits belong to.
    pub game_id: String,
    /// Score change per participant, in turn order.
    pub score_deltas: IndexMap<String, i64>,
}

/// Lifecycle status stored alongside a running game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatusEntity {
    /// Game accepts shots.
    Running,
}

/// Persisted representation of a running game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Opaque game identifier.
    pub id: String,
    /// Always `running` while the game is stored in the group slot.
    pub status: GameStatusEntity,
    /// Moment the game was started.
    pub started_at: SystemTime,
    /// Player who started the game.
    pub initiator_id: String,
    /// Number of turns before the cylinder is guaranteed empty.
    pub chamber_count: u32,
    /// Whether a live round was loaded for this game.
    pub bullet_present: bool,
    /// Whether the live round has already been fired.
    pub bullet_discharged: bool,
    /// Shots taken so far.
    pub shots_fired: u32,
    /// Participants keyed by player id, in turn order.
    pub participants: IndexMap<String, ParticipantEntity>,
}

/// A single player's turn inside a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Points wagered per chamber.
    pub bet: i64,
    /// Zero-based position in the shooting sequence.
    pub turn_order: u32,
    /// Whether this shot fired the live round.
    pub was_hit: bool,
    /// Moment the shot was taken.
    pub shot_at: SystemTime,
}

/// Per-player document within a group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Running score in the group.
    #[serde(default)]
    pub total_score: i64,
    /// Settled games already credited to the player.
    #[serde(default)]
    pub participated_game_ids: IndexSet<String>,
    /// Game initiations of the trailing 24 hours.
    #[serde(default)]
    pub initiation_timestamps: Vec<SystemTime>,
    /// UTC+8 date (`YYYY-MM-DD`) of the last credited sign-in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sign_in_date: Option<String>,
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcomeEntity {
    /// A participant was hit.
    Hit,
    /// Nobody was hit.
    AllSafe,
}

/// Immutable snapshot written once when a game settles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameHistoryEntity {
    /// Identifier of the settled game.
    pub id: String,
    /// Moment the game was started.
    pub started_at: SystemTime,
    /// Moment the game was settled.
    pub ended_at: SystemTime,
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
    /// How the game ended.
    pub outcome: GameOutcomeEntity,
    /// Participant who was hit, if any.
    pub hit_player_id: Option<String>,
    /// Turns keyed by player id, in turn order.
    pub participants: IndexMap<String, ParticipantEntity>,
    /// Score change applied to each participant, in turn order.
    pub score_deltas: IndexMap<String, i64>,
}

/// Per-group sign-in records keyed by UTC+8 date (`YYYY-MM-DD`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SignInLedgerEntity {
    /// Sign-ins per date.
    pub days: IndexMap<String, DailySignInsEntity>,
}

/// Sign-ins recorded for one day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailySignInsEntity {
    /// Accepted sign-ins in arrival order.
    #[serde(default)]
    pub sign_ins: Vec<SignInEntity>,
}

/// One accepted sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignInEntity {
    /// Player who signed in.
    pub player_id: String,
    /// Moment of the sign-in.
    pub signed_at: SystemTime,
    /// One-based rank of the day.
    pub order: u32,
    /// Fixed part of the award.
    #[serde(default)]
    pub base_points: i64,
    /// Early bird part of the award.
    #[serde(default)]
    pub bonus_points: i64,
    /// Total points credited.
    pub points_awarded: i64,
}
