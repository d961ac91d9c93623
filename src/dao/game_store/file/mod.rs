mod config;
mod error;
mod store;

pub use config::FileStoreConfig;
pub use error::{FileDaoError, FileResult};
pub use store::FileRouletteStore;

use crate::dao::storage::StorageError;

impl From<FileDaoError> for StorageError {
    fn from(err: FileDaoError) -> Self {
        match err {
            FileDaoError::InvalidKey { key } => StorageError::InvalidKey { key },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
