pub mod sheet_snapshot;

pub use sheet_snapshot::Entity as SheetSnapshot;
