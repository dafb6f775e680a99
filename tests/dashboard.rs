use assethub::domain::assets::AssetKind;
use assethub::domain::metrics::sum_currency;
use assethub::domain::{filter_and_sort, summarize, CategoryConfig, DueStatus, Record, SheetData};
use assethub::sheet::{LoadError, LocalWorkbook, SheetLoader, SnapshotStore};
use assethub::storage::establish_connection;
use assethub::storage::repository::SqliteSnapshotStore;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, 20)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn day(offset: i64) -> String {
    (now() + Duration::days(offset)).format("%Y-%m-%d").to_string()
}

fn workbook() -> Vec<SheetData> {
    vec![
        SheetData::new("Unrelated", vec![Record::from_pairs([("NAME", "x")])]),
        SheetData::new(
            "DIGITAL RADIO",
            vec![
                Record::from_pairs([
                    ("NAME", "North Hill"),
                    ("NEXTB_BAT", day(-1).as_str()),
                    ("TOWER_NO1", "A"),
                    ("RENT_YEAR", "1,200,000"),
                ]),
                Record::from_pairs([
                    ("NAME", "South Port"),
                    ("NEXTF_BAT", day(90).as_str()),
                    ("HANHELD", "2"),
                    ("RENT_YEAR", "500000"),
                ]),
            ],
        ),
        SheetData::new(
            "Pabx",
            vec![Record::from_pairs([("NAME", "Exchange"), ("next_bat ", day(10).as_str())])],
        ),
        SheetData::new("cctv ", vec![Record::from_pairs([("NAME", "Gate")])]),
    ]
}

#[test]
fn tables_are_filtered_and_ordered() {
    let sheets = filter_and_sort(workbook(), &CategoryConfig::default());
    let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["cctv ", "Pabx", "DIGITAL RADIO"]);
}

#[test]
fn radio_dashboard_scenario() {
    let sheets = filter_and_sort(workbook(), &CategoryConfig::default());
    let radio = &sheets[2];
    let s = summarize(radio, &CategoryConfig::default(), now());

    assert_eq!(s.bucket(DueStatus::Critical).count, 1);
    assert_eq!(s.bucket(DueStatus::Normal).count, 1);
    assert_eq!(s.bucket(DueStatus::Warning).count, 0);

    let assets = s.assets.as_ref().unwrap();
    assert_eq!(assets.get(AssetKind::Tower).names, vec!["North Hill (T1)"]);
    assert_eq!(assets.get(AssetKind::Handheld).count, 2);
    assert_eq!(s.rent_total, Some(1_700_000.0));
    assert_eq!(sum_currency(&radio.rows, "RENT_YEAR"), 1_700_000.0);

    let labels: Vec<String> = s.projection.series().iter().map(|b| b.label()).collect();
    assert_eq!(labels, vec!["05/2568", "08/2568"]);
}

#[test]
fn generic_sheet_resolves_messy_keys() {
    let sheets = filter_and_sort(workbook(), &CategoryConfig::default());
    let s = summarize(&sheets[1], &CategoryConfig::default(), now());
    assert_eq!(s.warning.names, vec!["Exchange"]);
}

async fn store() -> (tempfile::TempDir, Arc<SqliteSnapshotStore>) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("cache.db").display());
    let db = establish_connection(&url).await.unwrap();
    (dir, Arc::new(SqliteSnapshotStore::new(Arc::new(db))))
}

#[tokio::test]
async fn broken_workbook_falls_back_to_snapshot() {
    let (dir, store) = store().await;
    let bogus = dir.path().join("broken.xlsx");
    std::fs::write(&bogus, b"not a workbook").unwrap();

    let loader = SheetLoader::new(
        Some(Arc::new(LocalWorkbook::new(&bogus))),
        store.clone(),
        CategoryConfig::default(),
    );

    let err = loader.load().await.unwrap_err();
    assert!(matches!(err, LoadError::Unavailable { .. }));

    store.save(&workbook()).await.unwrap();
    let outcome = loader.load().await.unwrap();
    assert!(outcome.from_cache);
    assert!(outcome.fetch_error.is_some());
    assert_eq!(outcome.sheets.len(), 3);
    assert_eq!(outcome.sheets[0].name, "cctv ");
}

#[tokio::test]
async fn missing_source_uses_snapshot() {
    let (_dir, store) = store().await;
    store.save(&workbook()).await.unwrap();

    let loader = SheetLoader::new(None, store, CategoryConfig::default());
    let outcome = loader.load().await.unwrap();
    assert!(outcome.from_cache);
    assert_eq!(outcome.sheets[2].rows.len(), 2);
}

#[tokio::test]
async fn local_workbook_loads_and_saves_snapshot() {
    let (_dir, store) = store().await;
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/assets.xlsx");
    let loader = SheetLoader::new(
        Some(Arc::new(LocalWorkbook::new(path))),
        store.clone(),
        CategoryConfig::default(),
    );

    let outcome = loader.load().await.unwrap();
    assert!(!outcome.from_cache);
    assert!(outcome.fetch_error.is_none());
    let names: Vec<&str> = outcome.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["CCTV", "PABX"]);

    // 快照保存的是未过滤的完整工作簿
    let snapshot = store.restore().await.unwrap().unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot[0].rows[0].get("NEXT_BAT").unwrap().text(), "2024-01-15");
}
