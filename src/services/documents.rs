//! Loading persisted documents with the "use default, then persist it" recovery rule.

use tracing::{debug, warn};

use crate::{
    dao::{game_store::RouletteStore, models::GroupGameEntity, storage::Loaded},
    error::ServiceError,
    state::{
        game::{GroupGameState, PlayerRecord},
        sign_in::SignInLedger,
    },
};

/// Decode a group document, or `None` when it is missing, undecodable or inconsistent.
fn decode_group(group_id: &str, loaded: Loaded<GroupGameEntity>) -> Option<GroupGameState> {
    match loaded {
        Loaded::Found(entity) => match GroupGameState::try_from(entity) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(group_id, error = %err, "group document breaks game invariants");
                None
            }
        },
        Loaded::Missing => {
            debug!(group_id, "no group document yet");
            None
        }
        Loaded::Corrupt { reason } => {
            warn!(group_id, reason = %reason, "group document is corrupt");
            None
        }
    }
}

/// Group state for a mutating operation; a default document replaces a missing or bad one.
///
/// Callers must hold the group gate.
pub(crate) async fn load_group_state(
    store: &dyn RouletteStore,
    group_id: &str,
) -> Result<GroupGameState, ServiceError> {
    let loaded = store.load_group(group_id).await?;
    if let Some(state) = decode_group(group_id, loaded) {
        return Ok(state);
    }

    let state = GroupGameState::default();
    store.save_group(group_id, state.clone().into()).await?;
    Ok(state)
}

/// Group state for a read-only view; never writes.
pub(crate) async fn peek_group_state(
    store: &dyn RouletteStore,
    group_id: &str,
) -> Result<GroupGameState, ServiceError> {
    let loaded = store.load_group(group_id).await?;
    Ok(decode_group(group_id, loaded).unwrap_or_default())
}

/// Player record for a mutating operation. Callers must hold the group gate.
pub(crate) async fn load_player_record(
    store: &dyn RouletteStore,
    group_id: &str,
    player_id: &str,
) -> Result<PlayerRecord, ServiceError> {
    match store.load_player(group_id, player_id).await? {
        Loaded::Found(entity) => Ok(entity.into()),
        Loaded::Missing => {
            debug!(group_id, player_id, "creating player record");
            let record = PlayerRecord::default();
            store
                .save_player(group_id, player_id, record.clone().into())
                .await?;
            Ok(record)
        }
        Loaded::Corrupt { reason } => {
            warn!(
                group_id,
                player_id, reason = %reason, "player document is corrupt; resetting it"
            );
            let record = PlayerRecord::default();
            store
                .save_player(group_id, player_id, record.clone().into())
                .await?;
            Ok(record)
        }
    }
}

/// Sign-in ledger for a mutating operation. Callers must hold the group gate.
pub(crate) async fn load_sign_in_ledger(
    store: &dyn RouletteStore,
    group_id: &str,
) -> Result<SignInLedger, ServiceError> {
    let ledger = match store.load_sign_ins(group_id).await? {
        Loaded::Found(entity) => return Ok(entity.into()),
        Loaded::Missing => {
            debug!(group_id, "creating sign-in ledger");
            SignInLedger::default()
        }
        Loaded::Corrupt { reason } => {
            warn!(group_id, reason = %reason, "sign-in ledger is corrupt; resetting it");
            SignInLedger::default()
        }
    };
    store.save_sign_ins(group_id, ledger.clone().into()).await?;
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::dao::game_store::{
        file::{FileRouletteStore, FileStoreConfig},
        memory::MemoryRouletteStore,
    };
    use crate::dao::models::{GameEntity, GameStatusEntity};

    async fn file_store() -> (FileRouletteStore, std::path::PathBuf) {
        let root = std::env::temp_dir().join(format!("roulette-documents-{}", Uuid::new_v4()));
        let store = FileRouletteStore::open(FileStoreConfig::new(root.clone()))
            .await
            .unwrap();
        (store, root)
    }

    #[tokio::test]
    async fn missing_group_is_created_with_defaults() {
        let store = MemoryRouletteStore::new();

        let state = load_group_state(&store, "g1").await.unwrap();

        assert_eq!(state, GroupGameState::default());
        assert!(matches!(
            store.load_group("g1").await.unwrap(),
            Loaded::Found(_)
        ));
    }

    #[tokio::test]
    async fn corrupt_group_file_is_replaced_by_defaults() {
        let (store, root) = file_store().await;
        tokio::fs::create_dir_all(root.join("g1")).await.unwrap();
        tokio::fs::write(root.join("g1").join("game_status.json"), b"{ broken")
            .await
            .unwrap();

        let state = load_group_state(&store, "g1").await.unwrap();

        assert_eq!(state, GroupGameState::default());
        assert_eq!(
            store.load_group("g1").await.unwrap(),
            Loaded::Found(GroupGameEntity::default())
        );
        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn inconsistent_group_is_treated_as_corrupt() {
        let store = MemoryRouletteStore::new();
        let game = GameEntity {
            id: "g-1".into(),
            status: GameStatusEntity::Running,
            started_at: datetime!(2026-10-17 12:00 +8).into(),
            initiator_id: "u1".into(),
            chamber_count: 2,
            bullet_present: true,
            bullet_discharged: false,
            // More shots than chambers.
            shots_fired: 5,
            participants: Default::default(),
        };
        store
            .save_group(
                "g1",
                GroupGameEntity {
                    current_game: Some(game),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let state = load_group_state(&store, "g1").await.unwrap();
        assert!(state.current_game.is_none());
    }

    #[tokio::test]
    async fn peeking_never_writes() {
        let store = Arc::new(MemoryRouletteStore::new());

        let state = peek_group_state(store.as_ref(), "g1").await.unwrap();

        assert_eq!(state, GroupGameState::default());
        assert_eq!(store.load_group("g1").await.unwrap(), Loaded::Missing);
    }

    #[tokio::test]
    async fn corrupt_player_and_ledger_are_reset() {
        let (store, root) = file_store().await;
        let group_dir = root.join("g1");
        tokio::fs::create_dir_all(group_dir.join("players"))
            .await
            .unwrap();
        tokio::fs::write(group_dir.join("players").join("u1.json"), b"not json")
            .await
            .unwrap();
        tokio::fs::write(group_dir.join("signin_records.json"), b"[1, 2")
            .await
            .unwrap();

        let player = load_player_record(&store, "g1", "u1").await.unwrap();
        let ledger = load_sign_in_ledger(&store, "g1").await.unwrap();

        assert_eq!(player, PlayerRecord::default());
        assert_eq!(ledger, SignInLedger::default());
        assert!(matches!(
            store.load_player("g1", "u1").await.unwrap(),
            Loaded::Found(_)
        ));
        assert!(matches!(
            store.load_sign_ins("g1").await.unwrap(),
            Loaded::Found(_)
        ));
        let _ = tokio::fs::remove_dir_all(root).await;
    }
}
