use tracing::{info, warn};

use crate::{
    dao::{game_store::RouletteStore, storage::Loaded},
    dto::game::{
        CurrentGameResponse, EndGameResponse, GameHistoryDto, ShootRequest, ShootResponse,
        StartGameRequest, StartGameResponse,
    },
    error::ServiceError,
    services::{
        documents::{load_group_state, load_player_record, peek_group_state},
        ensure_identifier,
    },
    state::{
        SharedState,
        game::{GameHistory, GroupGameState},
        state_machine::{GameStateMachine, Settlement},
    },
};

/// Start a new game in `group_id`.
pub async fn start_game(
    state: &SharedState,
    group_id: &str,
    request: StartGameRequest,
) -> Result<StartGameResponse, ServiceError> {
    ensure_identifier("group id", group_id)?;
    ensure_identifier("initiator id", &request.initiator_id)?;
    let rules = &state.config().game;
    let chamber_count = request
        .chamber_count
        .unwrap_or(rules.default_chamber_count);

    let _gate = state.lock_group(group_id).await;
    let store = state.store();
    let group = load_group_for_update(store.as_ref(), group_id).await?;
    let mut initiator = load_player_record(store.as_ref(), group_id, &request.initiator_id).await?;

    let mut machine = GameStateMachine::new(group);
    let started = match machine.start(
        &request.initiator_id,
        &mut initiator,
        chamber_count,
        state.clock().now(),
        rules,
        state.chance(),
    ) {
        Ok(started) => started,
        Err(violation) => {
            info!(group_id, initiator_id = %request.initiator_id, %violation, "start refused");
            return Ok(StartGameResponse::rejected(violation));
        }
    };

    store
        .save_group(group_id, machine.into_state().into())
        .await?;
    store
        .save_player(group_id, &request.initiator_id, initiator.into())
        .await?;

    info!(
        group_id,
        game_id = %started.game_id,
        initiator_id = %request.initiator_id,
        chamber_count,
        "game started"
    );
    Ok(started.into())
}

/// Take a turn in the running game of `group_id`.
pub async fn shoot(
    state: &SharedState,
    group_id: &str,
    request: ShootRequest,
) -> Result<ShootResponse, ServiceError> {
    ensure_identifier("group id", group_id)?;
    ensure_identifier("player id", &request.player_id)?;
    let rules = &state.config().game;
    let bet = request.bet.unwrap_or(rules.default_bet);

    let _gate = state.lock_group(group_id).await;
    let store = state.store();
    let group = load_group_for_update(store.as_ref(), group_id).await?;

    let mut machine = GameStateMachine::new(group);
    let outcome = match machine.shoot(
        &request.player_id,
        bet,
        state.clock().now(),
        rules,
        state.chance(),
    ) {
        Ok(outcome) => outcome,
        Err(violation) => {
            info!(group_id, player_id = %request.player_id, %violation, "shot refused");
            return Ok(ShootResponse::rejected(violation));
        }
    };

    match &outcome.settlement {
        Some(settlement) => {
            persist_settlement(store.as_ref(), group_id, machine.into_state(), settlement).await?
        }
        None => {
            store
                .save_group(group_id, machine.into_state().into())
                .await?
        }
    }

    let player_id = &request.player_id;
    let message = match (&outcome.settlement, outcome.hit) {
        (Some(settlement), true) => format!("BANG! {player_id} was hit.\n{}", settlement.summary),
        (Some(settlement), false) => {
            format!("Click. {player_id} survived the last chamber.\n{}", settlement.summary)
        }
        (None, _) => format!(
            "Click. {player_id} survived, {} shots remaining.",
            outcome.shots_remaining
        ),
    };

    Ok(ShootResponse {
        success: true,
        message,
        game_over: outcome.settlement.is_some(),
        hit: outcome.hit,
        turn_order: Some(outcome.turn_order),
        shots_remaining: Some(outcome.shots_remaining),
        settlement: outcome.settlement.map(Into::into),
    })
}

/// Settle the running game of `group_id` with nobody hit.
pub async fn admin_end_game(
    state: &SharedState,
    group_id: &str,
) -> Result<EndGameResponse, ServiceError> {
    ensure_identifier("group id", group_id)?;

    let _gate = state.lock_group(group_id).await;
    let store = state.store();
    let group = load_group_for_update(store.as_ref(), group_id).await?;

    let mut machine = GameStateMachine::new(group);
    let settlement = match machine.force_end(state.clock().now()) {
        Ok(settlement) => settlement,
        Err(violation) => {
            info!(group_id, %violation, "admin end refused");
            return Ok(EndGameResponse::rejected(violation));
        }
    };

    persist_settlement(store.as_ref(), group_id, machine.into_state(), &settlement).await?;

    info!(group_id, game_id = %settlement.game_id, "game ended by admin");
    Ok(settlement.into())
}

/// Snapshot of the running game, if any.
pub async fn current_game(
    state: &SharedState,
    group_id: &str,
) -> Result<CurrentGameResponse, ServiceError> {
    ensure_identifier("group id", group_id)?;
    let group = peek_group_state(state.store().as_ref(), group_id).await?;
    Ok(group.current_game.into())
}

/// Archived record of a finished game.
pub async fn game_history(
    state: &SharedState,
    group_id: &str,
    game_id: &str,
) -> Result<GameHistoryDto, ServiceError> {
    ensure_identifier("group id", group_id)?;
    ensure_identifier("game id", game_id)?;

    match state.store().find_history(group_id, game_id).await? {
        Loaded::Found(entity) => Ok(GameHistory::from(entity).into()),
        Loaded::Missing => Err(ServiceError::NotFound(format!(
            "game `{game_id}` not found in group `{group_id}`"
        ))),
        Loaded::Corrupt { reason } => {
            warn!(group_id, game_id, reason = %reason, "history document is corrupt");
            Err(ServiceError::NotFound(format!(
                "game `{game_id}` has an unreadable history record"
            )))
        }
    }
}

/// Load the group for a mutating operation, first crediting what an interrupted
/// settlement still owes.
async fn load_group_for_update(
    store: &dyn RouletteStore,
    group_id: &str,
) -> Result<GroupGameState, ServiceError> {
    let mut group = load_group_state(store, group_id).await?;
    if let Some(payout) = &group.pending_payout {
        warn!(group_id, game_id = %payout.game_id, "resuming interrupted payout");
        credit_pending_payout(store, group_id, &mut group).await?;
    }
    Ok(group)
}

/// Archive the game, then store the emptied slot together with the owed credits, then pay.
///
/// Once the slot is stored the game cannot be settled again. Credits that fail afterwards
/// stay in the group document and are paid by the next mutating operation.
async fn persist_settlement(
    store: &dyn RouletteStore,
    group_id: &str,
    mut group: GroupGameState,
    settlement: &Settlement,
) -> Result<(), ServiceError> {
    store
        .append_history(group_id, settlement.history.clone().into())
        .await?;
    store.save_group(group_id, group.clone().into()).await?;

    info!(
        group_id,
        game_id = %settlement.game_id,
        outcome = settlement.outcome.as_str(),
        hit_player_id = ?settlement.hit_player_id,
        "game settled"
    );

    if let Err(error) = credit_pending_payout(store, group_id, &mut group).await {
        warn!(group_id, game_id = %settlement.game_id, %error, "payout deferred");
    }
    Ok(())
}

/// Credit every player still owed by the last settlement, then clear the marker.
///
/// Players already holding the game id are skipped, so a resumed payout never pays twice.
async fn credit_pending_payout(
    store: &dyn RouletteStore,
    group_id: &str,
    group: &mut GroupGameState,
) -> Result<(), ServiceError> {
    let Some(payout) = group.pending_payout.clone() else {
        return Ok(());
    };
    for (player_id, delta) in &payout.score_deltas {
        let mut player = load_player_record(store, group_id, player_id).await?;
        if player.apply_game_delta(&payout.game_id, *delta) {
            store.save_player(group_id, player_id, player.into()).await?;
        }
    }
    group.pending_payout = None;
    store.save_group(group_id, group.clone().into()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::{
            failing::{FailingStore, Write},
            memory::MemoryRouletteStore,
        },
        state::{
            AppState,
            chance::ScriptedChance,
            clock::{Clock, ManualClock},
        },
    };

    struct Harness {
        state: SharedState,
        store: MemoryRouletteStore,
        failing: FailingStore,
        clock: Arc<ManualClock>,
        chance: Arc<ScriptedChance>,
    }

    fn harness() -> Harness {
        let store = MemoryRouletteStore::new();
        let failing = FailingStore::new(store.clone());
        let clock = Arc::new(ManualClock::new(datetime!(2026-10-17 12:00 +8)));
        let chance = Arc::new(ScriptedChance::default());
        let state = AppState::with_parts(
            Arc::new(failing.clone()),
            AppConfig::default(),
            clock.clone(),
            chance.clone(),
        );
        Harness {
            state,
            store,
            failing,
            clock,
            chance,
        }
    }

    fn start_request(initiator: &str, chambers: Option<u32>) -> StartGameRequest {
        StartGameRequest {
            initiator_id: initiator.into(),
            chamber_count: chambers,
        }
    }

    fn shot(player: &str, bet: i64) -> ShootRequest {
        ShootRequest {
            player_id: player.into(),
            bet: Some(bet),
        }
    }

    async fn score(store: &MemoryRouletteStore, player: &str) -> i64 {
        match store.load_player("g1", player).await.unwrap() {
            Loaded::Found(entity) => entity.total_score,
            other => panic!("unexpected player document {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_uses_the_default_chamber_count() {
        let h = harness();

        let reply = start_game(&h.state, "g1", start_request("u1", None))
            .await
            .unwrap();

        assert!(reply.success);
        assert_eq!(reply.chamber_count, Some(6));
        let current = current_game(&h.state, "g1").await.unwrap();
        assert!(current.running);
        assert_eq!(current.game.unwrap().game_id, reply.game_id.unwrap());
    }

    #[tokio::test]
    async fn second_start_is_refused_while_running() {
        let h = harness();
        start_game(&h.state, "g1", start_request("u1", None))
            .await
            .unwrap();

        let reply = start_game(&h.state, "g1", start_request("u2", None))
            .await
            .unwrap();

        assert!(!reply.success);
        assert_eq!(reply.message, "a game is already running in this group");
    }

    #[tokio::test]
    async fn hit_settles_a_zero_sum_game() {
        let h = harness();
        start_game(&h.state, "g1", start_request("u1", Some(6)))
            .await
            .unwrap();
        h.chance.push([false, true]);

        let first = shoot(&h.state, "g1", shot("u1", 2)).await.unwrap();
        assert!(first.success && !first.game_over);
        assert_eq!(first.shots_remaining, Some(5));

        let second = shoot(&h.state, "g1", shot("u2", 2)).await.unwrap();
        assert!(second.game_over && second.hit);
        let settlement = second.settlement.unwrap();
        assert_eq!(settlement.outcome, "hit");
        assert_eq!(settlement.hit_player_id.as_deref(), Some("u2"));

        assert_eq!(score(&h.store, "u1").await, 12);
        assert_eq!(score(&h.store, "u2").await, -12);
        assert!(!current_game(&h.state, "g1").await.unwrap().running);

        let history = game_history(&h.state, "g1", &settlement.game_id)
            .await
            .unwrap();
        assert_eq!(history.shots_fired, 2);
        assert_eq!(history.turns.len(), 2);
        assert!(history.bullet_discharged);
    }

    #[tokio::test]
    async fn exhausting_the_chambers_pays_every_stake() {
        let h = harness();
        start_game(&h.state, "g1", start_request("u1", Some(4)))
            .await
            .unwrap();

        let mut last = None;
        for player in ["u1", "u2", "u3", "u4"] {
            last = Some(shoot(&h.state, "g1", shot(player, 2)).await.unwrap());
        }
        // An empty script never fires, so the final chamber is reached without a hit.
        let last = last.unwrap();
        assert!(last.game_over && !last.hit);
        assert_eq!(last.settlement.unwrap().outcome, "all_safe");
        for player in ["u1", "u2", "u3", "u4"] {
            assert_eq!(score(&h.store, player).await, 8);
        }
    }

    #[tokio::test]
    async fn shots_are_refused_without_a_game_or_twice() {
        let h = harness();
        let refused = shoot(&h.state, "g1", shot("u1", 1)).await.unwrap();
        assert!(!refused.success);

        start_game(&h.state, "g1", start_request("u1", None))
            .await
            .unwrap();
        shoot(&h.state, "g1", shot("u1", 1)).await.unwrap();
        let again = shoot(&h.state, "g1", shot("u1", 1)).await.unwrap();
        assert!(!again.success);
        assert_eq!(again.message, "u1 has already taken a turn in this game");

        let too_big = shoot(&h.state, "g1", shot("u2", 11)).await.unwrap();
        assert!(!too_big.success);
    }

    #[tokio::test]
    async fn admin_end_settles_once() {
        let h = harness();
        start_game(&h.state, "g1", start_request("u1", None))
            .await
            .unwrap();
        shoot(&h.state, "g1", shot("u2", 3)).await.unwrap();

        let ended = admin_end_game(&h.state, "g1").await.unwrap();
        assert!(ended.success);
        assert_eq!(score(&h.store, "u2").await, 18);

        let again = admin_end_game(&h.state, "g1").await.unwrap();
        assert!(!again.success);
        assert_eq!(again.message, "there is no running game in this group");
        assert_eq!(score(&h.store, "u2").await, 18);
    }

    #[tokio::test]
    async fn failed_archive_leaves_the_game_to_settle_once() {
        let h = harness();
        start_game(&h.state, "g1", start_request("u1", None))
            .await
            .unwrap();
        shoot(&h.state, "g1", shot("u2", 3)).await.unwrap();

        h.failing.fail_once(Write::AppendHistory);
        let err = admin_end_game(&h.state, "g1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert!(current_game(&h.state, "g1").await.unwrap().running);

        let retried = admin_end_game(&h.state, "g1").await.unwrap();
        assert!(retried.success);
        let again = admin_end_game(&h.state, "g1").await.unwrap();
        assert!(!again.success);
        assert_eq!(score(&h.store, "u2").await, 18);
    }

    #[tokio::test]
    async fn failed_slot_write_after_archiving_settles_once() {
        let h = harness();
        start_game(&h.state, "g1", start_request("u1", None))
            .await
            .unwrap();
        shoot(&h.state, "g1", shot("u2", 3)).await.unwrap();

        h.failing.fail_once(Write::SaveGroup);
        assert!(admin_end_game(&h.state, "g1").await.is_err());

        let retried = admin_end_game(&h.state, "g1").await.unwrap();
        assert!(retried.success);
        assert_eq!(score(&h.store, "u2").await, 18);
        let game_id = retried.settlement.unwrap().game_id;
        let history = game_history(&h.state, "g1", &game_id)
            .await
            .unwrap();
        assert_eq!(history.shots_fired, 1);
    }

    #[tokio::test]
    async fn failed_credit_is_paid_by_the_next_operation_exactly_once() {
        let h = harness();
        start_game(&h.state, "g1", start_request("u1", None))
            .await
            .unwrap();
        shoot(&h.state, "g1", shot("u1", 2)).await.unwrap();
        shoot(&h.state, "g1", shot("u2", 3)).await.unwrap();

        h.failing.fail_once(Write::SavePlayer);
        let ended = admin_end_game(&h.state, "g1").await.unwrap();
        assert!(ended.success);
        match h.store.load_group("g1").await.unwrap() {
            Loaded::Found(group) => {
                assert!(group.current_game.is_none());
                assert!(group.pending_payout.is_some());
            }
            other => panic!("unexpected group document {other:?}"),
        }

        let refused = admin_end_game(&h.state, "g1").await.unwrap();
        assert!(!refused.success);
        assert_eq!(score(&h.store, "u1").await, 12);
        assert_eq!(score(&h.store, "u2").await, 18);

        start_game(&h.state, "g1", start_request("u3", None))
            .await
            .unwrap();
        assert_eq!(score(&h.store, "u1").await, 12);
        assert_eq!(score(&h.store, "u2").await, 18);
        match h.store.load_group("g1").await.unwrap() {
            Loaded::Found(group) => assert!(group.pending_payout.is_none()),
            other => panic!("unexpected group document {other:?}"),
        }
    }

    #[tokio::test]
    async fn daily_cap_rolls_over_at_midnight() {
        let h = harness();
        // Players take turns initiating so the cooldown never applies.
        for initiator in ["a", "b", "c", "d", "e"] {
            let started = start_game(&h.state, "g1", start_request(initiator, None))
                .await
                .unwrap();
            assert!(started.success, "{}", started.message);
            admin_end_game(&h.state, "g1").await.unwrap();
        }

        let capped = start_game(&h.state, "g1", start_request("f", None))
            .await
            .unwrap();
        assert!(!capped.success);
        assert_eq!(capped.message, "this group has reached today's limit of 5 games");

        h.clock.set(datetime!(2026-10-18 00:00 +8));
        let next_day = start_game(&h.state, "g1", start_request("f", None))
            .await
            .unwrap();
        assert!(next_day.success);
    }

    #[tokio::test]
    async fn cooldown_applies_per_initiator() {
        let h = harness();
        start_game(&h.state, "g1", start_request("u1", None))
            .await
            .unwrap();
        admin_end_game(&h.state, "g1").await.unwrap();

        h.clock.advance(time::Duration::minutes(2));
        let early = start_game(&h.state, "g1", start_request("u1", None))
            .await
            .unwrap();
        assert!(!early.success);
        assert_eq!(early.message, "you started a game recently, try again in 180s");

        h.clock.advance(time::Duration::minutes(3));
        let later = start_game(&h.state, "g1", start_request("u1", None))
            .await
            .unwrap();
        assert!(later.success);
        assert_eq!(h.clock.now(), datetime!(2026-10-17 12:05 +8));
    }

    #[tokio::test]
    async fn unknown_history_is_not_found() {
        let h = harness();
        let err = game_history(&h.state, "g1", "nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_group_ids_are_rejected_before_storage() {
        let h = harness();
        let err = start_game(&h.state, "../g1", start_request("u1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}
