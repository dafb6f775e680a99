pub mod snapshot_repo;

pub use snapshot_repo::{SnapshotRepository, SqliteSnapshotStore, LATEST_KEY};
