use indexmap::IndexMap;
use thiserror::Error;
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use crate::state::{
    chance::Chance,
    clock::GROUP_OFFSET,
    game::{
        GameHistory, GameOutcome, GameRecord, GameStatus, GroupGameState, Participant,
        PendingPayout, PlayerRecord,
    },
};

/// High-level phases a group can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// No game in the slot.
    Idle,
    /// A game is accepting shots.
    Running,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A player starts a new game.
    Start,
    /// A player takes a turn.
    Shoot,
    /// An admin settles the game early.
    ForceEnd,
}

/// Whether a live round is loaded when a game starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BulletMode {
    /// Every game carries a live round.
    Always,
    /// A live round is loaded with the given probability, decided once per game.
    Chance {
        /// Probability in `[0, 1]`.
        probability: f64,
    },
}

/// Tunable limits applied by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    /// Settled games allowed per group and calendar day.
    pub max_daily_games: u32,
    /// Minimum delay between two initiations by the same player; zero disables the check.
    pub initiation_cooldown: Duration,
    /// Smallest accepted bet.
    pub min_bet: i64,
    /// Largest accepted bet.
    pub max_bet: i64,
    /// Chamber count used when a start request omits it.
    pub default_chamber_count: u32,
    /// Bet used when a shoot request omits it.
    pub default_bet: i64,
    /// How the live round is loaded.
    pub bullet_mode: BulletMode,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_daily_games: 5,
            initiation_cooldown: Duration::minutes(5),
            min_bet: 1,
            max_bet: 10,
            default_chamber_count: 6,
            default_bet: 1,
            bullet_mode: BulletMode::Always,
        }
    }
}

/// Why an operation was refused. Displayed verbatim to players.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    /// The group slot is taken.
    #[error("a game is already running in this group")]
    AlreadyRunning,
    /// The group settled its daily allowance of games.
    #[error("this group has reached today's limit of {limit} games")]
    DailyCapReached {
        /// Configured daily cap.
        limit: u32,
    },
    /// The initiator started another game too recently.
    #[error("you started a game recently, try again in {remaining_secs}s")]
    CooldownActive {
        /// Seconds until the initiator may start again.
        remaining_secs: i64,
    },
    /// A game needs at least one chamber.
    #[error("chamber count must be at least 1 (got {chamber_count})")]
    InvalidChamberCount {
        /// Requested chamber count.
        chamber_count: u32,
    },
    /// The group slot is empty.
    #[error("there is no running game in this group")]
    NoRunningGame,
    /// Each player shoots at most once per game.
    #[error("{player_id} has already taken a turn in this game")]
    AlreadyShot {
        /// Player who tried to shoot again.
        player_id: String,
    },
    /// The bet is outside the configured range.
    #[error("bet must be between {min} and {max} (got {bet})")]
    BetOutOfRange {
        /// Requested bet.
        bet: i64,
        /// Smallest accepted bet.
        min: i64,
        /// Largest accepted bet.
        max: i64,
    },
}

/// Result of a successful start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedGame {
    /// Identifier of the new game.
    pub game_id: String,
    /// Chambers in the cylinder.
    pub chamber_count: u32,
}

/// Result of a successful shot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotOutcome {
    /// Zero-based position of the shot.
    pub turn_order: u32,
    /// Whether the shot fired the live round.
    pub hit: bool,
    /// Shots left before the cylinder is empty (zero once the game ended).
    pub shots_remaining: u32,
    /// Present when this shot ended the game.
    pub settlement: Option<Settlement>,
}

/// Everything produced by settling a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Identifier of the settled game.
    pub game_id: String,
    /// How the game ended.
    pub outcome: GameOutcome,
    /// Participant who was hit, if any.
    pub hit_player_id: Option<String>,
    /// Score change per participant, in turn order.
    pub score_deltas: IndexMap<String, i64>,
    /// Multi-line human readable recap.
    pub summary: String,
    /// Record to archive.
    pub history: GameHistory,
}

enum EndReason {
    Hit(String),
    ChambersExhausted,
    Forced,
}

/// Drives one group's game slot through Idle → Running → Idle.
#[derive(Debug, Clone, Default)]
pub struct GameStateMachine {
    state: GroupGameState,
}

impl GameStateMachine {
    /// Wrap the persisted state of one group.
    pub fn new(state: GroupGameState) -> Self {
        Self { state }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        match self.state.current_game {
            Some(_) => GamePhase::Running,
            None => GamePhase::Idle,
        }
    }

    /// Borrow the group state.
    pub fn state(&self) -> &GroupGameState {
        &self.state
    }

    /// Give back the group state for persistence.
    pub fn into_state(self) -> GroupGameState {
        self.state
    }

    /// Check that `event` is allowed from the current phase.
    fn ensure_transition(&self, event: GameEvent) -> Result<(), RuleViolation> {
        match (self.phase(), event) {
            (GamePhase::Idle, GameEvent::Start) => Ok(()),
            (GamePhase::Running, GameEvent::Shoot | GameEvent::ForceEnd) => Ok(()),
            (GamePhase::Running, GameEvent::Start) => Err(RuleViolation::AlreadyRunning),
            (GamePhase::Idle, GameEvent::Shoot | GameEvent::ForceEnd) => {
                Err(RuleViolation::NoRunningGame)
            }
        }
    }

    /// Reset the daily counter when the stored date is not `today`.
    fn roll_daily_counter(&mut self, today: Date) {
        if self.state.last_reset_date != Some(today) {
            self.state.daily_games_ended = 0;
            self.state.last_reset_date = Some(today);
        }
    }

    /// Start a game for `initiator_id`, recording the initiation on `initiator` when accepted.
    pub fn start(
        &mut self,
        initiator_id: &str,
        initiator: &mut PlayerRecord,
        chamber_count: u32,
        now: OffsetDateTime,
        rules: &GameRules,
        chance: &dyn Chance,
    ) -> Result<StartedGame, RuleViolation> {
        self.ensure_transition(GameEvent::Start)?;

        self.roll_daily_counter(now.to_offset(GROUP_OFFSET).date());
        if self.state.daily_games_ended >= rules.max_daily_games {
            return Err(RuleViolation::DailyCapReached {
                limit: rules.max_daily_games,
            });
        }

        if rules.initiation_cooldown > Duration::ZERO {
            if let Some(last) = initiator.last_initiation() {
                let elapsed = now - last;
                if elapsed < rules.initiation_cooldown {
                    let remaining = rules.initiation_cooldown - elapsed;
                    return Err(RuleViolation::CooldownActive {
                        remaining_secs: ((remaining.whole_milliseconds() + 999) / 1000) as i64,
                    });
                }
            }
        }

        if chamber_count == 0 {
            return Err(RuleViolation::InvalidChamberCount { chamber_count });
        }

        let bullet_present = match rules.bullet_mode {
            BulletMode::Always => true,
            BulletMode::Chance { probability } => chance.bullet_loaded(probability),
        };

        let game = GameRecord {
            id: Uuid::new_v4().to_string(),
            status: GameStatus::Running,
            started_at: now,
            initiator_id: initiator_id.to_string(),
            chamber_count,
            bullet_present,
            bullet_discharged: false,
            shots_fired: 0,
            participants: IndexMap::new(),
        };
        let started = StartedGame {
            game_id: game.id.clone(),
            chamber_count,
        };

        self.state.current_game = Some(game);
        initiator.record_initiation(now);

        Ok(started)
    }

    /// Take `player_id`'s turn, settling the game when it ends.
    pub fn shoot(
        &mut self,
        player_id: &str,
        bet: i64,
        now: OffsetDateTime,
        rules: &GameRules,
        chance: &dyn Chance,
    ) -> Result<ShotOutcome, RuleViolation> {
        self.ensure_transition(GameEvent::Shoot)?;
        let Some(game) = self.state.current_game.as_mut() else {
            return Err(RuleViolation::NoRunningGame);
        };

        if game.participants.contains_key(player_id) {
            return Err(RuleViolation::AlreadyShot {
                player_id: player_id.to_string(),
            });
        }
        if !(rules.min_bet..=rules.max_bet).contains(&bet) {
            return Err(RuleViolation::BetOutOfRange {
                bet,
                min: rules.min_bet,
                max: rules.max_bet,
            });
        }

        let turn_order = game.shots_fired;
        let hit = game.bullet_present
            && !game.bullet_discharged
            && chance.trigger_fires(game.remaining_chambers());
        if hit {
            game.bullet_discharged = true;
        }
        game.participants.insert(
            player_id.to_string(),
            Participant {
                bet,
                turn_order,
                was_hit: hit,
                shot_at: now,
            },
        );
        game.shots_fired += 1;
        let shots_remaining = game.remaining_chambers();

        let reason = if hit {
            Some(EndReason::Hit(player_id.to_string()))
        } else if shots_remaining == 0 {
            Some(EndReason::ChambersExhausted)
        } else {
            None
        };
        let settlement = match reason {
            Some(reason) => self
                .state
                .current_game
                .take()
                .map(|game| self.settle(game, reason, now)),
            None => None,
        };

        Ok(ShotOutcome {
            turn_order,
            hit,
            shots_remaining,
            settlement,
        })
    }

    /// Settle the running game with nobody hit, however many shots were fired.
    pub fn force_end(&mut self, now: OffsetDateTime) -> Result<Settlement, RuleViolation> {
        self.ensure_transition(GameEvent::ForceEnd)?;
        let game = self
            .state
            .current_game
            .take()
            .ok_or(RuleViolation::NoRunningGame)?;
        Ok(self.settle(game, EndReason::Forced, now))
    }

    /// Compute payouts, count the game for today and empty the slot.
    ///
    /// Each participant stakes `chamber_count × bet`: the hit player loses it, everybody
    /// else wins it. With nobody hit every participant wins their own stake.
    fn settle(&mut self, game: GameRecord, reason: EndReason, now: OffsetDateTime) -> Settlement {
        let hit_player_id = match &reason {
            EndReason::Hit(player_id) => Some(player_id.clone()),
            EndReason::ChambersExhausted | EndReason::Forced => None,
        };
        let outcome = if hit_player_id.is_some() {
            GameOutcome::Hit
        } else {
            GameOutcome::AllSafe
        };

        let multiplier = i64::from(game.chamber_count);
        let score_deltas: IndexMap<String, i64> = game
            .participants
            .iter()
            .map(|(player_id, participant)| {
                let stake = multiplier.saturating_mul(participant.bet);
                let delta = if hit_player_id.as_deref() == Some(player_id.as_str()) {
                    -stake
                } else {
                    stake
                };
                (player_id.clone(), delta)
            })
            .collect();

        self.roll_daily_counter(now.to_offset(GROUP_OFFSET).date());
        self.state.daily_games_ended += 1;
        self.state.pending_payout = Some(PendingPayout {
            game_id: game.id.clone(),
            score_deltas: score_deltas.clone(),
        });

        let summary = render_summary(&game, &reason, &score_deltas);
        let history = GameHistory {
            id: game.id.clone(),
            started_at: game.started_at,
            ended_at: now,
            initiator_id: game.initiator_id,
            chamber_count: game.chamber_count,
            bullet_present: game.bullet_present,
            bullet_discharged: game.bullet_discharged,
            shots_fired: game.shots_fired,
            outcome,
            hit_player_id: hit_player_id.clone(),
            participants: game.participants,
            score_deltas: score_deltas.clone(),
        };

        Settlement {
            game_id: game.id,
            outcome,
            hit_player_id,
            score_deltas,
            summary,
            history,
        }
    }
}

fn render_summary(
    game: &GameRecord,
    reason: &EndReason,
    score_deltas: &IndexMap<String, i64>,
) -> String {
    let mut lines = vec![format!(
        "Game {} is over after {} of {} shots.",
        game.id, game.shots_fired, game.chamber_count
    )];
    lines.push(match reason {
        EndReason::Hit(player_id) => format!("{player_id} was hit."),
        EndReason::ChambersExhausted => "Every chamber was empty, nobody was hit.".to_string(),
        EndReason::Forced => "The game was ended by an admin, nobody was hit.".to_string(),
    });

    if score_deltas.is_empty() {
        lines.push("Nobody took a turn.".to_string());
    } else {
        lines.push("Score changes:".to_string());
        lines.extend(
            score_deltas
                .iter()
                .map(|(player_id, delta)| format!("  {player_id}: {delta:+}")),
        );
    }

    lines.join("\n")
}
