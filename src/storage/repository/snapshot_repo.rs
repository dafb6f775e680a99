use crate::domain::record::SheetData;
use crate::sheet::error::LoadError;
use crate::sheet::loader::SnapshotStore;
use crate::storage::entity::sheet_snapshot::{
    self, ActiveModel as SnapshotActiveModel, Entity as SheetSnapshot, Model as SnapshotModel,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};
use std::sync::Arc;

/// 工作集只保留一份快照
pub const LATEST_KEY: &str = "latest";

pub struct SnapshotRepository;

impl SnapshotRepository {
    pub async fn save(
        db: &DatabaseConnection,
        key: &str,
        sheets: &[SheetData],
    ) -> Result<(), DbErr> {
        let payload =
            serde_json::to_string(sheets).map_err(|e| DbErr::Custom(format!("encode: {e}")))?;
        let row_count: usize = sheets.iter().map(|s| s.rows.len()).sum();

        let active_model = SnapshotActiveModel {
            key: Set(key.to_string()),
            payload: Set(payload),
            sheet_count: Set(sheets.len() as i32),
            row_count: Set(row_count as i32),
            saved_at: Set(Utc::now().timestamp()),
        };

        // 整体覆盖，不做合并
        SheetSnapshot::insert(active_model)
            .on_conflict(
                OnConflict::column(sheet_snapshot::Column::Key)
                    .update_columns([
                        sheet_snapshot::Column::Payload,
                        sheet_snapshot::Column::SheetCount,
                        sheet_snapshot::Column::RowCount,
                        sheet_snapshot::Column::SavedAt,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn find(
        db: &DatabaseConnection,
        key: &str,
    ) -> Result<Option<SnapshotModel>, DbErr> {
        SheetSnapshot::find_by_id(key.to_string()).one(db).await
    }

    pub async fn load(
        db: &DatabaseConnection,
        key: &str,
    ) -> Result<Option<Vec<SheetData>>, DbErr> {
        let Some(model) = Self::find(db, key).await? else {
            return Ok(None);
        };
        let sheets = serde_json::from_str(&model.payload)
            .map_err(|e| DbErr::Custom(format!("decode snapshot {}: {e}", model.key)))?;
        Ok(Some(sheets))
    }
}

/// SQLite 实现的快照存储
pub struct SqliteSnapshotStore {
    db: Arc<DatabaseConnection>,
}

impl SqliteSnapshotStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn save(&self, sheets: &[SheetData]) -> Result<(), LoadError> {
        SnapshotRepository::save(&self.db, LATEST_KEY, sheets)
            .await
            .map_err(|e| LoadError::Snapshot(e.to_string()))
    }

    async fn restore(&self) -> Result<Option<Vec<SheetData>>, LoadError> {
        SnapshotRepository::load(&self.db, LATEST_KEY)
            .await
            .map_err(|e| LoadError::Snapshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Record;
    use crate::storage::establish_connection;

    async fn temp_db() -> (tempfile::TempDir, DatabaseConnection) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("snap.db").display());
        let db = establish_connection(&url).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn save_then_load_preserves_column_order() {
        let (_dir, db) = temp_db().await;
        assert!(SnapshotRepository::load(&db, LATEST_KEY).await.unwrap().is_none());

        let sheets = vec![SheetData::new(
            "CCTV",
            vec![Record::from_pairs([
                ("ZONE", "B"),
                ("NAME", "Gate"),
                ("NEXT_BAT", "2025-02-01"),
            ])],
        )];
        SnapshotRepository::save(&db, LATEST_KEY, &sheets).await.unwrap();

        let restored = SnapshotRepository::load(&db, LATEST_KEY).await.unwrap().unwrap();
        assert_eq!(restored, sheets);
        assert_eq!(
            restored[0].rows[0].keys().collect::<Vec<_>>(),
            vec!["ZONE", "NAME", "NEXT_BAT"]
        );
        let meta = SnapshotRepository::find(&db, LATEST_KEY).await.unwrap().unwrap();
        assert_eq!(meta.row_count, 1);
    }

    #[tokio::test]
    async fn later_save_replaces_whole_snapshot() {
        let (_dir, db) = temp_db().await;
        let store = SqliteSnapshotStore::new(Arc::new(db));
        let first = vec![
            SheetData::new("CCTV", vec![Record::from_pairs([("NAME", "a")])]),
            SheetData::new("PABX", vec![Record::from_pairs([("NAME", "b")])]),
        ];
        let second = vec![SheetData::new("PABX", Vec::new())];
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();
        assert_eq!(store.restore().await.unwrap(), Some(second));
    }
}
