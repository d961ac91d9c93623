//! Test store that fails chosen writes once, then behaves like the memory store.

use std::{io, sync::Arc};

use dashmap::DashSet;
use futures::future::{self, BoxFuture};

use crate::dao::{
    game_store::{RouletteStore, memory::MemoryRouletteStore},
    models::{GameHistoryEntity, GroupGameEntity, PlayerEntity, SignInLedgerEntity},
    storage::{Loaded, StorageError, StorageResult},
};

/// Write operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Write {
    SaveGroup,
    SavePlayer,
    AppendHistory,
    SaveSignIns,
}

/// Wraps a [`MemoryRouletteStore`]; cloning shares documents and armed failures.
#[derive(Clone)]
pub(crate) struct FailingStore {
    inner: MemoryRouletteStore,
    armed: Arc<DashSet<Write>>,
}

impl FailingStore {
    pub(crate) fn new(inner: MemoryRouletteStore) -> Self {
        Self {
            inner,
            armed: Arc::default(),
        }
    }

    /// Make the next `write` fail.
    pub(crate) fn fail_once(&self, write: Write) {
        self.armed.insert(write);
    }

    fn trip(&self, write: Write) -> StorageResult<()> {
        match self.armed.remove(&write) {
            Some(_) => Err(StorageError::unavailable(
                format!("{write:?} failed"),
                io::Error::other("disk unplugged"),
            )),
            None => Ok(()),
        }
    }
}

fn failed(error: StorageError) -> BoxFuture<'static, StorageResult<()>> {
    Box::pin(future::ready(Err(error)))
}

impl RouletteStore for FailingStore {
    fn load_group(&self, group_id: &str) -> BoxFuture<'static, StorageResult<Loaded<GroupGameEntity>>> {
        self.inner.load_group(group_id)
    }

    fn save_group(
        &self,
        group_id: &str,
        group: GroupGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        match self.trip(Write::SaveGroup) {
            Ok(()) => self.inner.save_group(group_id, group),
            Err(error) => failed(error),
        }
    }

    fn load_player(
        &self,
        group_id: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<PlayerEntity>>> {
        self.inner.load_player(group_id, player_id)
    }

    fn save_player(
        &self,
        group_id: &str,
        player_id: &str,
        player: PlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        match self.trip(Write::SavePlayer) {
            Ok(()) => self.inner.save_player(group_id, player_id, player),
            Err(error) => failed(error),
        }
    }

    fn list_players(
        &self,
        group_id: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<(String, Loaded<PlayerEntity>)>>> {
        self.inner.list_players(group_id)
    }

    fn append_history(
        &self,
        group_id: &str,
        history: GameHistoryEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        match self.trip(Write::AppendHistory) {
            Ok(()) => self.inner.append_history(group_id, history),
            Err(error) => failed(error),
        }
    }

    fn find_history(
        &self,
        group_id: &str,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<GameHistoryEntity>>> {
        self.inner.find_history(group_id, game_id)
    }

    fn load_sign_ins(
        &self,
        group_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<SignInLedgerEntity>>> {
        self.inner.load_sign_ins(group_id)
    }

    fn save_sign_ins(
        &self,
        group_id: &str,
        ledger: SignInLedgerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        match self.trip(Write::SaveSignIns) {
            Ok(()) => self.inner.save_sign_ins(group_id, ledger),
            Err(error) => failed(error),
        }
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }
}
