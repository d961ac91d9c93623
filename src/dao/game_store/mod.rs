#[cfg(test)]
pub(crate) mod failing;
/// JSON files under a root directory.
pub mod file;
pub mod memory;

use crate::dao::models::{GameHistoryEntity, GroupGameEntity, PlayerEntity, SignInLedgerEntity};
use crate::dao::storage::{Loaded, StorageResult};
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for groups, players, game history and sign-ins.
///
/// Every document is read and written as a whole; the last write wins.
pub trait RouletteStore: Send + Sync {
    /// Group document holding the daily counter and the game slot.
    fn load_group(&self, group_id: &str) -> BoxFuture<'static, StorageResult<Loaded<GroupGameEntity>>>;
    /// Replace the group document.
    fn save_group(
        &self,
        group_id: &str,
        group: GroupGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Score document of one player.
    fn load_player(
        &self,
        group_id: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<PlayerEntity>>>;
    /// Replace a player document.
    fn save_player(
        &self,
        group_id: &str,
        player_id: &str,
        player: PlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Every player document of the group, including undecodable ones.
    fn list_players(
        &self,
        group_id: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<(String, Loaded<PlayerEntity>)>>>;
    /// Archive a settled game under its id; writing the same id again replaces it.
    fn append_history(
        &self,
        group_id: &str,
        history: GameHistoryEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Archived record of one game.
    fn find_history(
        &self,
        group_id: &str,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<GameHistoryEntity>>>;
    /// Sign-in ledger of the group.
    fn load_sign_ins(
        &self,
        group_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<SignInLedgerEntity>>>;
    /// Replace the sign-in ledger.
    fn save_sign_ins(
        &self,
        group_id: &str,
        ledger: SignInLedgerEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Verify the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Characters accepted in identifiers used as storage keys.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
