pub mod assets;
pub mod category;
pub mod due;
pub mod editor;
pub mod metrics;
pub mod naming;
pub mod record;
pub mod resolve;
pub mod summary;
pub mod table_view;

pub use category::{filter_and_sort, CategoryConfig};
pub use due::{classify, DueStatus};
pub use record::{CellValue, Record, SheetData};
pub use resolve::resolve_field;
pub use summary::{summarize, summarize_all, SheetSummary};
