use tracing::{info, warn};

use crate::{
    dto::sign_in::{SignInRequest, SignInResponse},
    error::ServiceError,
    services::{
        documents::{load_player_record, load_sign_in_ledger},
        ensure_identifier,
    },
    state::{SharedState, sign_in::SignInOutcome},
};

/// Grant today's sign-in bonus to a player, at most once per day.
pub async fn perform_sign_in(
    state: &SharedState,
    group_id: &str,
    request: SignInRequest,
) -> Result<SignInResponse, ServiceError> {
    ensure_identifier("group id", group_id)?;
    ensure_identifier("player id", &request.player_id)?;
    let player_id = request.player_id.as_str();

    let _gate = state.lock_group(group_id).await;
    let store = state.store();
    let mut ledger = load_sign_in_ledger(store.as_ref(), group_id).await?;

    let entry = match ledger.sign_in(player_id, state.clock().now(), &state.config().sign_in) {
        SignInOutcome::SignedIn(entry) => entry,
        SignInOutcome::Closed {
            start_hour,
            end_hour,
        } => {
            return Ok(SignInResponse::rejected(
                format!("Sign-in is open from {start_hour:02}:00 to {end_hour:02}:00 (UTC+8)."),
                None,
            ));
        }
        SignInOutcome::AlreadySignedIn { points_awarded } => {
            return Ok(SignInResponse::rejected(
                format!(
                    "{player_id} already signed in today and received {points_awarded} points."
                ),
                Some(points_awarded),
            ));
        }
    };

    // Credit before storing the ledger; the player remembers the credited day.
    let mut player = load_player_record(store.as_ref(), group_id, player_id).await?;
    let credited = player.award_sign_in(entry.signed_at.date(), entry.points_awarded);
    let total_score = player.total_score;
    if credited {
        store.save_player(group_id, player_id, player.into()).await?;
    } else {
        warn!(group_id, player_id, "sign-in day already credited, storing the ledger only");
    }

    store.save_sign_ins(group_id, ledger.into()).await?;

    info!(
        group_id,
        player_id,
        order = entry.order,
        points = entry.points_awarded,
        "player signed in"
    );

    let message = if entry.bonus_points > 0 {
        format!(
            "{player_id} is #{} today: +{} points ({} + {} early bird bonus).",
            entry.order, entry.points_awarded, entry.base_points, entry.bonus_points
        )
    } else {
        format!(
            "{player_id} is #{} today: +{} points.",
            entry.order, entry.points_awarded
        )
    };

    Ok(SignInResponse {
        success: true,
        message,
        points_awarded: Some(entry.points_awarded),
        order: Some(entry.order),
        total_score: Some(total_score),
    })
}
