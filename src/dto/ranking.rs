use serde::Serialize;
use utoipa::ToSchema;

/// One line of the group leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RankingEntry {
    /// 1-based position.
    pub rank: u32,
    /// Ranked player.
    pub player_id: String,
    /// Score in the group.
    pub total_score: i64,
}

/// Leaderboard of a group, highest score first.
#[derive(Debug, Serialize, ToSchema)]
pub struct RankingResponse {
    /// Ranked group.
    pub group_id: String,
    /// Players with a readable score document.
    pub entries: Vec<RankingEntry>,
}
