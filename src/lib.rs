pub mod ai;
pub mod config;
pub mod domain;
pub(crate) mod http;
pub mod insight;
pub mod sheet;
pub mod storage;

pub use config::AppConfig;
pub use domain::{CategoryConfig, DueStatus, Record, SheetData};
pub use sheet::{LoadError, LoadOutcome, SheetLoader};
