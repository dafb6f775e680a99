use crate::storage::entity::sheet_snapshot;
use log::info;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use std::time::Duration;

pub async fn establish_connection(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());
    opt.max_connections(4)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    // 内存库不支持 WAL
    if !db_url.contains(":memory:") {
        db.execute(sea_orm::Statement::from_string(
            sea_orm::DatabaseBackend::Sqlite,
            "PRAGMA journal_mode=WAL;".to_string(),
        ))
        .await?;
    }

    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // 快照表
    let stmt = builder.build(
        schema
            .create_table_from_entity(sheet_snapshot::Entity)
            .if_not_exists(),
    );
    db.execute(stmt).await?;

    info!("snapshot store ready: {}", db_url);

    Ok(db)
}
