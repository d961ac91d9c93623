/// Randomness behind bullet loading and trigger pulls.
pub mod chance;
/// Time source and the UTC+8 group day.
pub mod clock;
/// Group, game and player state.
pub mod game;
/// Daily sign-in ledger.
pub mod sign_in;
/// Game lifecycle and settlement rules.
pub mod state_machine;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    config::AppConfig,
    dao::game_store::RouletteStore,
    state::{
        chance::{Chance, RandomChance},
        clock::{Clock, SystemClock},
    },
};

/// Handle shared by every request.
pub type SharedState = Arc<AppState>;

type GroupGates = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Central application state: storage handle, configuration and per-group locks.
pub struct AppState {
    store: Arc<dyn RouletteStore>,
    config: AppConfig,
    clock: Arc<dyn Clock>,
    chance: Arc<dyn Chance>,
    group_gates: GroupGates,
}

/// Exclusive access to one group, released on drop.
///
/// The last holder removes the group's gate from the map when nobody waits on it.
pub struct GroupGuard {
    guard: Option<OwnedMutexGuard<()>>,
    gates: GroupGates,
    group_id: String,
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold a clone of the gate, so a count of one means the map owns it alone.
        self.gates
            .remove_if(&self.group_id, |_, gate| Arc::strong_count(gate) == 1);
    }
}

impl AppState {
    /// Construct a new [`AppState`] using the wall clock and an OS-seeded random source.
    pub fn new(store: Arc<dyn RouletteStore>, config: AppConfig) -> SharedState {
        Self::with_parts(
            store,
            config,
            Arc::new(SystemClock),
            Arc::new(RandomChance::from_entropy()),
        )
    }

    /// Construct an [`AppState`] with explicit time and randomness sources.
    pub fn with_parts(
        store: Arc<dyn RouletteStore>,
        config: AppConfig,
        clock: Arc<dyn Clock>,
        chance: Arc<dyn Chance>,
    ) -> SharedState {
        Arc::new(Self {
            store,
            config,
            clock,
            chance,
            group_gates: GroupGates::default(),
        })
    }

    /// Storage backend.
    pub fn store(&self) -> Arc<dyn RouletteStore> {
        self.store.clone()
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Time source.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Random source.
    pub fn chance(&self) -> &dyn Chance {
        self.chance.as_ref()
    }

    /// Serialize every read-modify-write touching `group_id`.
    ///
    /// The guard must be held from the first load to the last save of an operation.
    pub async fn lock_group(&self, group_id: &str) -> GroupGuard {
        let gate = self
            .group_gates
            .entry(group_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        GroupGuard {
            guard: Some(gate.lock_owned().await),
            gates: self.group_gates.clone(),
            group_id: group_id.to_string(),
        }
    }

    #[cfg(test)]
    fn gate_count(&self) -> usize {
        self.group_gates.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::game_store::memory::MemoryRouletteStore;

    #[tokio::test]
    async fn group_lock_is_exclusive_per_group() {
        let state = AppState::new(Arc::new(MemoryRouletteStore::new()), AppConfig::default());

        let held = state.lock_group("g1").await;
        let same_group =
            tokio::time::timeout(Duration::from_millis(50), state.lock_group("g1")).await;
        assert!(same_group.is_err());

        let other_group =
            tokio::time::timeout(Duration::from_millis(50), state.lock_group("g2")).await;
        assert!(other_group.is_ok());

        drop(held);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), state.lock_group("g1")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn released_gates_are_removed() {
        let state = AppState::new(Arc::new(MemoryRouletteStore::new()), AppConfig::default());

        for index in 0..500 {
            let _gate = state.lock_group(&format!("group-{index}")).await;
        }
        assert_eq!(state.gate_count(), 0);

        let held = state.lock_group("g1").await;
        assert_eq!(state.gate_count(), 1);
        drop(held);
        assert_eq!(state.gate_count(), 0);
    }

    #[tokio::test]
    async fn gate_stays_while_a_waiter_queues() {
        let state = AppState::new(Arc::new(MemoryRouletteStore::new()), AppConfig::default());
        let held = state.lock_group("g1").await;

        let waiter = {
            let state = state.clone();
            tokio::spawn(async move {
                let _gate = state.lock_group("g1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        assert_eq!(state.gate_count(), 1);

        waiter.await.unwrap();
        assert_eq!(state.gate_count(), 0);
    }
}
