use std::time::SystemTime;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use time::{Date, Duration, OffsetDateTime};

use crate::{
    dao::models::{
        GameEntity, GameHistoryEntity, GameOutcomeEntity, GameStatusEntity, GroupGameEntity,
        ParticipantEntity, PendingPayoutEntity, PlayerEntity,
    },
    state::clock::{GROUP_OFFSET, date_key, parse_date_key},
};

/// Initiation timestamps older than this are dropped.
const INITIATION_WINDOW: Duration = Duration::hours(24);

/// Lifecycle status of a game held in the group slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// The game accepts shots.
    Running,
}

/// Per-group state: daily counter plus the single game slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupGameState {
    /// Games settled on `last_reset_date`.
    pub daily_games_ended: u32,
    /// Calendar date (UTC+8) the counter refers to.
    pub last_reset_date: Option<Date>,
    /// Present while a game is running.
    pub current_game: Option<GameRecord>,
    /// Credits of the last settlement still owed to some players.
    pub pending_payout: Option<PendingPayout>,
}

/// Score changes of a settled game, held in the group document until every player is credited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayout {
    /// Settled game the credits belong to.
    pub game_id: String,
    /// Score change per participant, in turn order.
    pub score_deltas: IndexMap<String, i64>,
}

/// A running game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Opaque game identifier.
    pub id: String,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Moment the game was started, in UTC+8.
    pub started_at: OffsetDateTime,
    /// Player who started the game.
    pub initiator_id: String,
    /// Chambers in the cylinder.
    pub chamber_count: u32,
    /// Whether a live round was loaded.
    pub bullet_present: bool,
    /// Whether the live round was fired.
    pub bullet_discharged: bool,
    /// Shots taken so far.
    pub shots_fired: u32,
    /// Keyed by player id; iteration order is turn order.
    pub participants: IndexMap<String, Participant>,
}

impl GameRecord {
    /// Chambers not yet fired.
    pub fn remaining_chambers(&self) -> u32 {
        self.chamber_count.saturating_sub(self.shots_fired)
    }
}

/// One player's turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Points wagered per chamber.
    pub bet: i64,
    /// Zero-based position in the shooting sequence.
    pub turn_order: u32,
    /// Whether this shot fired the live round.
    pub was_hit: bool,
    /// Moment the shot was taken.
    pub shot_at: OffsetDateTime,
}

/// Score ledger of a player within a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Running score in the group.
    pub total_score: i64,
    /// Settled games already credited, in settlement order.
    pub participated_game_ids: IndexSet<String>,
    /// Oldest first, limited to the trailing 24 hours.
    pub initiation_timestamps: Vec<OffsetDateTime>,
    /// Group day of the last credited sign-in.
    pub last_sign_in: Option<Date>,
}

impl PlayerRecord {
    /// Most recent game initiation, if any.
    pub fn last_initiation(&self) -> Option<OffsetDateTime> {
        self.initiation_timestamps.iter().max().copied()
    }

    /// Record a game initiation, pruning entries older than 24 hours.
    pub fn record_initiation(&mut self, now: OffsetDateTime) {
        self.initiation_timestamps
            .retain(|timestamp| now - *timestamp < INITIATION_WINDOW);
        self.initiation_timestamps.push(now);
    }

    /// Apply a settlement delta and remember the game.
    ///
    /// Returns `false` without touching the score when the game was already credited.
    pub fn apply_game_delta(&mut self, game_id: &str, delta: i64) -> bool {
        if !self.participated_game_ids.insert(game_id.to_string()) {
            return false;
        }
        self.total_score = self.total_score.saturating_add(delta);
        true
    }

    /// Credit the sign-in bonus of `day`.
    ///
    /// Returns `false` without touching the score when that day was already credited.
    pub fn award_sign_in(&mut self, day: Date, points: i64) -> bool {
        if self.last_sign_in == Some(day) {
            return false;
        }
        self.last_sign_in = Some(day);
        self.total_score = self.total_score.saturating_add(points);
        true
    }
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// Someone was hit.
    Hit,
    /// Every shot was safe, or the game was ended early.
    AllSafe,
}

impl GameOutcome {
    /// Wire name of the outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            GameOutcome::Hit => "hit",
            GameOutcome::AllSafe => "all_safe",
        }
    }
}

/// Immutable record of a finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameHistory {
    /// Identifier of the settled game.
    pub id: String,
    /// Moment the game was started.
    pub started_at: OffsetDateTime,
    /// Moment the game was settled.
    pub ended_at: OffsetDateTime,
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
    pub outcome: GameOutcome,
    /// Participant who was hit, if any.
    pub hit_player_id: Option<String>,
    /// Turns keyed by player id, in turn order.
    pub participants: IndexMap<String, Participant>,
    /// Score change per participant, in turn order.
    pub score_deltas: IndexMap<String, i64>,
}

/// A persisted group document that breaks the game invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid group document: {0}")]
pub struct InvalidDocument(pub String);

pub(crate) fn to_local(time: SystemTime) -> OffsetDateTime {
    OffsetDateTime::from(time).to_offset(GROUP_OFFSET)
}

impl TryFrom<GroupGameEntity> for GroupGameState {
    type Error = InvalidDocument;

    fn try_from(entity: GroupGameEntity) -> Result<Self, Self::Error> {
        let last_reset_date = entity
            .last_reset_date
            .map(|value| {
                parse_date_key(&value)
                    .ok_or_else(|| InvalidDocument(format!("unparsable reset date `{value}`")))
            })
            .transpose()?;

        let current_game = entity.current_game.map(GameRecord::try_from).transpose()?;

        Ok(Self {
            daily_games_ended: entity.daily_games_ended,
            last_reset_date,
            current_game,
            pending_payout: entity.pending_payout.map(Into::into),
        })
    }
}

impl TryFrom<GameEntity> for GameRecord {
    type Error = InvalidDocument;

    fn try_from(entity: GameEntity) -> Result<Self, Self::Error> {
        if entity.chamber_count == 0 {
            return Err(InvalidDocument(format!(
                "game `{}` has no chambers",
                entity.id
            )));
        }
        if entity.shots_fired >= entity.chamber_count {
            return Err(InvalidDocument(format!(
                "running game `{}` fired {} of {} chambers",
                entity.id, entity.shots_fired, entity.chamber_count
            )));
        }
        if entity.participants.len() != entity.shots_fired as usize {
            return Err(InvalidDocument(format!(
                "game `{}` records {} participants for {} shots",
                entity.id,
                entity.participants.len(),
                entity.shots_fired
            )));
        }
        if entity
            .participants
            .values()
            .enumerate()
            .any(|(index, participant)| participant.turn_order as usize != index)
        {
            return Err(InvalidDocument(format!(
                "game `{}` has an inconsistent turn order",
                entity.id
            )));
        }
        let hits = entity.participants.values().filter(|p| p.was_hit).count();
        if hits > 0 || entity.bullet_discharged {
            // A hit settles the game at once, so a running game never holds one.
            return Err(InvalidDocument(format!(
                "running game `{}` already discharged its bullet",
                entity.id
            )));
        }

        Ok(Self {
            id: entity.id,
            status: match entity.status {
                GameStatusEntity::Running => GameStatus::Running,
            },
            started_at: to_local(entity.started_at),
            initiator_id: entity.initiator_id,
            chamber_count: entity.chamber_count,
            bullet_present: entity.bullet_present,
            bullet_discharged: entity.bullet_discharged,
            shots_fired: entity.shots_fired,
            participants: entity
                .participants
                .into_iter()
                .map(|(id, participant)| (id, participant.into()))
                .collect(),
        })
    }
}

impl From<GroupGameState> for GroupGameEntity {
    fn from(value: GroupGameState) -> Self {
        Self {
            daily_games_ended: value.daily_games_ended,
            last_reset_date: value.last_reset_date.map(date_key),
            current_game: value.current_game.map(Into::into),
            pending_payout: value.pending_payout.map(Into::into),
        }
    }
}

impl From<PendingPayoutEntity> for PendingPayout {
    fn from(value: PendingPayoutEntity) -> Self {
        Self {
            game_id: value.game_id,
            score_deltas: value.score_deltas,
        }
    }
}

impl From<PendingPayout> for PendingPayoutEntity {
    fn from(value: PendingPayout) -> Self {
        Self {
            game_id: value.game_id,
            score_deltas: value.score_deltas,
        }
    }
}

impl From<GameRecord> for GameEntity {
    fn from(value: GameRecord) -> Self {
        Self {
            id: value.id,
            status: match value.status {
                GameStatus::Running => GameStatusEntity::Running,
            },
            started_at: value.started_at.into(),
            initiator_id: value.initiator_id,
            chamber_count: value.chamber_count,
            bullet_present: value.bullet_present,
            bullet_discharged: value.bullet_discharged,
            shots_fired: value.shots_fired,
            participants: value
                .participants
                .into_iter()
                .map(|(id, participant)| (id, participant.into()))
                .collect(),
        }
    }
}

impl From<ParticipantEntity> for Participant {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            bet: value.bet,
            turn_order: value.turn_order,
            was_hit: value.was_hit,
            shot_at: to_local(value.shot_at),
        }
    }
}

impl From<Participant> for ParticipantEntity {
    fn from(value: Participant) -> Self {
        Self {
            bet: value.bet,
            turn_order: value.turn_order,
            was_hit: value.was_hit,
            shot_at: value.shot_at.into(),
        }
    }
}

impl From<PlayerEntity> for PlayerRecord {
    fn from(value: PlayerEntity) -> Self {
        Self {
            total_score: value.total_score,
            participated_game_ids: value.participated_game_ids,
            initiation_timestamps: value
                .initiation_timestamps
                .into_iter()
                .map(to_local)
                .collect(),
            // An unreadable date only allows a second credit on that day.
            last_sign_in: value.last_sign_in_date.as_deref().and_then(parse_date_key),
        }
    }
}

impl From<PlayerRecord> for PlayerEntity {
    fn from(value: PlayerRecord) -> Self {
        Self {
            total_score: value.total_score,
            participated_game_ids: value.participated_game_ids,
            initiation_timestamps: value
                .initiation_timestamps
                .into_iter()
                .map(Into::into)
                .collect(),
            last_sign_in_date: value.last_sign_in.map(date_key),
        }
    }
}

impl From<GameOutcomeEntity> for GameOutcome {
    fn from(value: GameOutcomeEntity) -> Self {
        match value {
            GameOutcomeEntity::Hit => GameOutcome::Hit,
            GameOutcomeEntity::AllSafe => GameOutcome::AllSafe,
        }
    }
}

impl From<GameOutcome> for GameOutcomeEntity {
    fn from(value: GameOutcome) -> Self {
        match value {
            GameOutcome::Hit => GameOutcomeEntity::Hit,
            GameOutcome::AllSafe => GameOutcomeEntity::AllSafe,
        }
    }
}

impl From<GameHistoryEntity> for GameHistory {
    fn from(value: GameHistoryEntity) -> Self {
        Self {
            id: value.id,
            started_at: to_local(value.started_at),
            ended_at: to_local(value.ended_at),
            initiator_id: value.initiator_id,
            chamber_count: value.chamber_count,
            bullet_present: value.bullet_present,
            bullet_discharged: value.bullet_discharged,
            shots_fired: value.shots_fired,
            outcome: value.outcome.into(),
            hit_player_id: value.hit_player_id,
            participants: value
                .participants
                .into_iter()
                .map(|(id, participant)| (id, participant.into()))
                .collect(),
            score_deltas: value.score_deltas,
        }
    }
}

impl From<GameHistory> for GameHistoryEntity {
    fn from(value: GameHistory) -> Self {
        Self {
            id: value.id,
            started_at: value.started_at.into(),
            ended_at: value.ended_at.into(),
            initiator_id: value.initiator_id,
            chamber_count: value.chamber_count,
            bullet_present: value.bullet_present,
            bullet_discharged: value.bullet_discharged,
            shots_fired: value.shots_fired,
            outcome: value.outcome.into(),
            hit_player_id: value.hit_player_id,
            participants: value
                .participants
                .into_iter()
                .map(|(id, participant)| (id, participant.into()))
                .collect(),
            score_deltas: value.score_deltas,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn running_entity() -> GameEntity {
        GameEntity {
            id: "game-1".into(),
            status: GameStatusEntity::Running,
            started_at: SystemTime::UNIX_EPOCH,
            initiator_id: "u1".into(),
            chamber_count: 6,
            bullet_present: true,
            bullet_discharged: false,
            shots_fired: 1,
            participants: IndexMap::from([(
                "u1".to_string(),
                ParticipantEntity {
                    bet: 2,
                    turn_order: 0,
                    was_hit: false,
                    shot_at: SystemTime::UNIX_EPOCH,
                },
            )]),
        }
    }

    #[test]
    fn initiation_window_drops_entries_older_than_a_day() {
        let mut player = PlayerRecord::default();
        let start = datetime!(2026-10-17 08:00 +8);
        player.record_initiation(start);
        player.record_initiation(start + Duration::hours(20));
        player.record_initiation(start + Duration::hours(25));

        assert_eq!(
            player.initiation_timestamps,
            vec![start + Duration::hours(20), start + Duration::hours(25)]
        );
        assert_eq!(player.last_initiation(), Some(start + Duration::hours(25)));
    }

    #[test]
    fn a_game_is_credited_once() {
        let mut player = PlayerRecord::default();
        assert!(player.apply_game_delta("g", 12));
        assert!(!player.apply_game_delta("g", 12));
        assert!(player.apply_game_delta("h", -4));

        assert_eq!(player.total_score, 8);
        assert_eq!(player.participated_game_ids.len(), 2);
    }

    #[test]
    fn a_sign_in_day_is_credited_once() {
        let mut player = PlayerRecord::default();
        let day = datetime!(2026-10-17 08:00 +8).date();
        assert!(player.award_sign_in(day, 60));
        assert!(!player.award_sign_in(day, 60));
        assert!(player.award_sign_in(day.next_day().unwrap(), 10));

        assert_eq!(player.total_score, 70);
        let entity = PlayerEntity::from(player.clone());
        assert_eq!(entity.last_sign_in_date.as_deref(), Some("2026-10-18"));
        assert_eq!(PlayerRecord::from(entity), player);
    }

    #[test]
    fn pending_payout_survives_the_document_round_trip() {
        let state = GroupGameState {
            daily_games_ended: 1,
            last_reset_date: Some(datetime!(2026-10-17 08:00 +8).date()),
            current_game: None,
            pending_payout: Some(PendingPayout {
                game_id: "game-1".into(),
                score_deltas: IndexMap::from([("u1".to_string(), 12), ("u2".to_string(), -12)]),
            }),
        };

        let entity = GroupGameEntity::from(state.clone());

        assert_eq!(GroupGameState::try_from(entity).unwrap(), state);
    }

    #[test]
    fn consistent_running_game_is_accepted() {
        let entity = GroupGameEntity {
            daily_games_ended: 1,
            last_reset_date: Some("2026-10-17".into()),
            current_game: Some(running_entity()),
            pending_payout: None,
        };

        let state = GroupGameState::try_from(entity.clone()).unwrap();

        assert_eq!(state.current_game.as_ref().unwrap().remaining_chambers(), 5);
        assert_eq!(GroupGameEntity::from(state), entity);
    }

    #[test]
    fn exhausted_running_game_is_rejected() {
        let mut game = running_entity();
        game.chamber_count = 1;

        let entity = GroupGameEntity {
            current_game: Some(game),
            ..Default::default()
        };

        assert!(GroupGameState::try_from(entity).is_err());
    }

    #[test]
    fn participant_count_must_match_shots() {
        let mut game = running_entity();
        game.shots_fired = 2;

        let entity = GroupGameEntity {
            current_game: Some(game),
            ..Default::default()
        };

        assert!(GroupGameState::try_from(entity).is_err());
    }

    #[test]
    fn unparsable_reset_date_is_rejected() {
        let entity = GroupGameEntity {
            last_reset_date: Some("17/10/2026".into()),
            ..Default::default()
        };

        assert!(GroupGameState::try_from(entity).is_err());
    }
}
