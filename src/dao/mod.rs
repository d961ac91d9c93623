/// Document storage backends (JSON files, in-memory).
pub mod game_store;
/// Persisted document definitions.
pub mod models;
/// Storage abstraction layer shared by every backend.
pub mod storage;
