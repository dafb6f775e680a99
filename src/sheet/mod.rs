pub mod error;
pub mod fetch;
pub mod loader;
pub mod parser;
pub mod sync;

pub use error::{LoadError, SyncError};
pub use fetch::{LocalWorkbook, RemoteWorkbook};
pub use loader::{LoadOutcome, SheetLoader, SheetSource, SnapshotStore};
pub use sync::{SheetSync, SyncAction};
