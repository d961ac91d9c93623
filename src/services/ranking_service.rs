use tracing::warn;

use crate::{
    dao::storage::Loaded,
    dto::ranking::{RankingEntry, RankingResponse},
    error::ServiceError,
    services::ensure_identifier,
    state::SharedState,
};

/// Every player of `group_id`, highest score first; ties go by player id.
///
/// Read-only: undecodable player documents are skipped and left as they are.
pub async fn get_ranking(
    state: &SharedState,
    group_id: &str,
) -> Result<RankingResponse, ServiceError> {
    ensure_identifier("group id", group_id)?;

    let mut scores: Vec<(String, i64)> = state
        .store()
        .list_players(group_id)
        .await?
        .into_iter()
        .filter_map(|(player_id, loaded)| match loaded {
            Loaded::Found(player) => Some((player_id, player.total_score)),
            Loaded::Missing => None,
            Loaded::Corrupt { reason } => {
                warn!(group_id, player_id = %player_id, reason = %reason, "skipping corrupt player in ranking");
                None
            }
        })
        .collect();
    scores.sort_by(|(a_id, a_score), (b_id, b_score)| {
        b_score.cmp(a_score).then_with(|| a_id.cmp(b_id))
    });

    let entries = scores
        .into_iter()
        .zip(1..)
        .map(|((player_id, total_score), rank)| RankingEntry {
            rank,
            player_id,
            total_score,
        })
        .collect();

    Ok(RankingResponse {
        group_id: group_id.to_string(),
        entries,
    })
}
