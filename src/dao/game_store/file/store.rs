use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;
use tracing::debug;

use crate::dao::{
    game_store::{RouletteStore, is_valid_key},
    models::{GameHistoryEntity, GroupGameEntity, PlayerEntity, SignInLedgerEntity},
    storage::{Loaded, StorageResult},
};

use super::{
    config::FileStoreConfig,
    error::{FileDaoError, FileResult},
};

const GROUP_FILE: &str = "game_status.json";
const SIGN_IN_FILE: &str = "signin_records.json";
const PLAYERS_DIR: &str = "players";
const HISTORY_DIR: &str = "game_history";
const JSON_EXTENSION: &str = "json";

/// Store keeping one JSON document per group, player, finished game and sign-in ledger.
#[derive(Clone)]
pub struct FileRouletteStore {
    root: Arc<PathBuf>,
}

impl FileRouletteStore {
    /// Open the store, creating the data root when it does not exist yet.
    pub async fn open(config: FileStoreConfig) -> FileResult<Self> {
        let store = Self {
            root: Arc::new(config.root),
        };
        store.ensure_root().await?;
        Ok(store)
    }

    async fn ensure_root(&self) -> FileResult<()> {
        let root: &PathBuf = &self.root;
        fs::create_dir_all(root)
            .await
            .map_err(|source| FileDaoError::CreateDir {
                path: root.clone(),
                source,
            })?;
        let metadata = fs::metadata(root)
            .await
            .map_err(|source| FileDaoError::Read {
                path: root.clone(),
                source,
            })?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(FileDaoError::NotADirectory { path: root.clone() })
        }
    }

    fn group_dir(&self, group_id: &str) -> FileResult<PathBuf> {
        ensure_key(group_id)?;
        Ok(self.root.join(group_id))
    }

    fn player_path(&self, group_id: &str, player_id: &str) -> FileResult<PathBuf> {
        ensure_key(player_id)?;
        Ok(self
            .group_dir(group_id)?
            .join(PLAYERS_DIR)
            .join(document_name(player_id)))
    }

    fn history_path(&self, group_id: &str, game_id: &str) -> FileResult<PathBuf> {
        ensure_key(game_id)?;
        Ok(self
            .group_dir(group_id)?
            .join(HISTORY_DIR)
            .join(document_name(game_id)))
    }
}

fn ensure_key(key: &str) -> FileResult<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(FileDaoError::InvalidKey {
            key: key.to_string(),
        })
    }
}

fn document_name(key: &str) -> String {
    format!("{key}.{JSON_EXTENSION}")
}

async fn read_document<T>(path: &Path) -> FileResult<Loaded<T>>
where
    T: DeserializeOwned,
{
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(source) => {
            return Err(FileDaoError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    match serde_json::from_slice::<T>(&bytes) {
        Ok(document) => Ok(Loaded::Found(document)),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "undecodable document");
            Ok(Loaded::Corrupt {
                reason: err.to_string(),
            })
        }
    }
}

/// Write through a sibling temporary file so readers never observe a torn document.
async fn write_document<T>(path: &Path, document: &T) -> FileResult<()>
where
    T: ?Sized + Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| FileDaoError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let payload = serde_json::to_vec_pretty(document).map_err(|source| FileDaoError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload)
        .await
        .map_err(|source| FileDaoError::Write {
            path: tmp_path.clone(),
            source,
        })?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|source| FileDaoError::Write {
            path: path.to_path_buf(),
            source,
        })
}

async fn list_documents<T>(dir: &Path) -> FileResult<Vec<(String, Loaded<T>)>>
where
    T: DeserializeOwned,
{
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(FileDaoError::Read {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut documents = Vec::new();
    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|source| FileDaoError::Read {
                path: dir.to_path_buf(),
                source,
            })?;
        let Some(entry) = entry else {
            break;
        };

        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(JSON_EXTENSION) {
            continue;
        }
        let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if !is_valid_key(key) {
            continue;
        }

        documents.push((key.to_string(), read_document(&path).await?));
    }

    documents.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(documents)
}

impl RouletteStore for FileRouletteStore {
    fn load_group(&self, group_id: &str) -> BoxFuture<'static, StorageResult<Loaded<GroupGameEntity>>> {
        let path = self.group_dir(group_id).map(|dir| dir.join(GROUP_FILE));
        Box::pin(async move { Ok(read_document(&path?).await?) })
    }

    fn save_group(
        &self,
        group_id: &str,
        group: GroupGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.group_dir(group_id).map(|dir| dir.join(GROUP_FILE));
        Box::pin(async move { Ok(write_document(&path?, &group).await?) })
    }

    fn load_player(
        &self,
        group_id: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<PlayerEntity>>> {
        let path = self.player_path(group_id, player_id);
        Box::pin(async move { Ok(read_document(&path?).await?) })
    }

    fn save_player(
        &self,
        group_id: &str,
        player_id: &str,
        player: PlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.player_path(group_id, player_id);
        Box::pin(async move { Ok(write_document(&path?, &player).await?) })
    }

    fn list_players(
        &self,
        group_id: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<(String, Loaded<PlayerEntity>)>>> {
        let dir = self.group_dir(group_id).map(|dir| dir.join(PLAYERS_DIR));
        Box::pin(async move { Ok(list_documents(&dir?).await?) })
    }

    fn append_history(
        &self,
        group_id: &str,
        history: GameHistoryEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.history_path(group_id, &history.id);
        Box::pin(async move { Ok(write_document(&path?, &history).await?) })
    }

    fn find_history(
        &self,
        group_id: &str,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<GameHistoryEntity>>> {
        let path = self.history_path(group_id, game_id);
        Box::pin(async move { Ok(read_document(&path?).await?) })
    }

    fn load_sign_ins(
        &self,
        group_id: &str,
    ) -> BoxFuture<'static, StorageResult<Loaded<SignInLedgerEntity>>> {
        let path = self.group_dir(group_id).map(|dir| dir.join(SIGN_IN_FILE));
        Box::pin(async move { Ok(read_document(&path?).await?) })
    }

    fn save_sign_ins(
        &self,
        group_id: &str,
        ledger: SignInLedgerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.group_dir(group_id).map(|dir| dir.join(SIGN_IN_FILE));
        Box::pin(async move { Ok(write_document(&path?, &ledger).await?) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ensure_root().await?) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uuid::Uuid;

    use super::*;

    async fn temp_store() -> (FileRouletteStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("roulette-store-{}", Uuid::new_v4()));
        let store = FileRouletteStore::open(FileStoreConfig::new(root.clone()))
            .await
            .unwrap();
        (store, root)
    }

    #[tokio::test]
    async fn missing_documents_are_reported_as_missing() {
        let (store, root) = temp_store().await;

        assert_eq!(store.load_group("g1").await.unwrap(), Loaded::Missing);
        assert_eq!(store.load_player("g1", "u1").await.unwrap(), Loaded::Missing);
        assert!(store.list_players("g1").await.unwrap().is_empty());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn group_document_survives_a_round_trip() {
        let (store, root) = temp_store().await;
        let group = GroupGameEntity {
            daily_games_ended: 3,
            last_reset_date: Some("2026-10-17".into()),
            current_game: None,
            pending_payout: None,
        };

        store.save_group("g1", group.clone()).await.unwrap();

        assert_eq!(store.load_group("g1").await.unwrap(), Loaded::Found(group));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn undecodable_document_is_reported_as_corrupt() {
        let (store, root) = temp_store().await;
        let dir = root.join("g1");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(GROUP_FILE), b"{ not json").unwrap();

        assert!(matches!(
            store.load_group("g1").await.unwrap(),
            Loaded::Corrupt { .. }
        ));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn list_players_includes_corrupt_entries_in_key_order() {
        let (store, root) = temp_store().await;
        let player = PlayerEntity {
            total_score: 12,
            participated_game_ids: Default::default(),
            initiation_timestamps: vec![SystemTime::now()],
            last_sign_in_date: None,
        };
        store.save_player("g1", "u2", player.clone()).await.unwrap();
        std::fs::write(root.join("g1").join(PLAYERS_DIR).join("u1.json"), b"not json").unwrap();

        let listed = store.list_players("g1").await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].0, "u1");
        assert!(matches!(listed[0].1, Loaded::Corrupt { .. }));
        assert_eq!(listed[1], ("u2".to_string(), Loaded::Found(player)));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn path_like_keys_are_rejected() {
        let (store, root) = temp_store().await;

        let err = store.load_player("g1", "../escape").await.unwrap_err();

        assert!(matches!(err, crate::dao::storage::StorageError::InvalidKey { .. }));
        let _ = std::fs::remove_dir_all(root);
    }
}
