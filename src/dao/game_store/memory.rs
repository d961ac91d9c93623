//! Process-local store used by tests and ephemeral deployments.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{self, BoxFuture};

use crate::dao::{
    game_store::{RouletteStore, is_valid_key},
    models::{GameHistoryEntity, GroupGameEntity, PlayerEntity, SignInLedgerEntity},
    storage::{Loaded, StorageError, StorageResult},
};

type GroupKey = String;
type ScopedKey = (String, String);

#[derive(Default)]
struct Documents {
    groups: DashMap<GroupKey, GroupGameEntity>,
    players: DashMap<ScopedKey, PlayerEntity>,
    history: DashMap<ScopedKey, GameHistoryEntity>,
    sign_ins: DashMap<GroupKey, SignInLedgerEntity>,
}

/// In-memory [`RouletteStore`]; cloning shares the same documents.
#[derive(Clone, Default)]
pub struct MemoryRouletteStore {
    documents: Arc<Documents>,
}

impl MemoryRouletteStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(value: &str) -> StorageResult<String> {
    if is_valid_key(value) {
        Ok(value.to_string())
    } else {
        Err(StorageError::InvalidKey {
            key: value.to_string(),
        })
    }
}

fn scoped(group_id: &str, id: &str) -> StorageResult<ScopedKey> {
    Ok((key(group_id)?, key(id)?))
}

fn found_or_missing<T>(value: Option<T>) -> Loaded<T> {
    value.map_or(Loaded::Missing, Loaded::Found)
}

fn ready<T: Send + 'static>(result: StorageResult<T>) -> BoxFuture<'static, StorageResult<T>> {
    Box::pin(future::ready(result))
}

impl RouletteStore for MemoryRouletteStore {
    fn load_group(&self, group_id: &str) -> BoxFuture<'static, StorageResult<Loaded<GroupGameEntity>>> {
        ready(key(group_id).map(|group_id| {
            found_or_missing(self.documents.groups.get(&group_id).map(|doc| doc.clone()))
        }))
    }

    fn save_group(
        &self,
        group_id: &str,
        group: GroupGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        ready(key(group_id).map(|group_id| {
            self.documents.groups.insert(group_id, group);
        }))
    }

    fn load_player(
        &self,
        group_id: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<PlayerEntity>>> {
        ready(scoped(group_id, player_id).map(|id| {
            found_or_missing(self.documents.players.get(&id).map(|doc| doc.clone()))
        }))
    }

    fn save_player(
        &self,
        group_id: &str,
        player_id: &str,
        player: PlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        ready(scoped(group_id, player_id).map(|id| {
            self.documents.players.insert(id, player);
        }))
    }

    fn list_players(
        &self,
        group_id: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<(String, Loaded<PlayerEntity>)>>> {
        ready(key(group_id).map(|group_id| {
            let mut players: Vec<(String, Loaded<PlayerEntity>)> = self
                .documents
                .players
                .iter()
                .filter(|entry| entry.key().0 == group_id)
                .map(|entry| (entry.key().1.clone(), Loaded::Found(entry.value().clone())))
                .collect();
            players.sort_by(|(a, _), (b, _)| a.cmp(b));
            players
        }))
    }

    fn append_history(
        &self,
        group_id: &str,
        history: GameHistoryEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        ready(scoped(group_id, &history.id).map(|id| {
            self.documents.history.insert(id, history);
        }))
    }

    fn find_history(
        &self,
        group_id: &str,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<GameHistoryEntity>>> {
        ready(scoped(group_id, game_id).map(|id| {
            found_or_missing(self.documents.history.get(&id).map(|doc| doc.clone()))
        }))
    }

    fn load_sign_ins(
        &self,
        group_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<SignInLedgerEntity>>> {
        ready(key(group_id).map(|group_id| {
            found_or_missing(self.documents.sign_ins.get(&group_id).map(|doc| doc.clone()))
        }))
    }

    fn save_sign_ins(
        &self,
        group_id: &str,
        ledger: SignInLedgerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        ready(key(group_id).map(|group_id| {
            self.documents.sign_ins.insert(group_id, ledger);
        }))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        ready(Ok(()))
    }
}
