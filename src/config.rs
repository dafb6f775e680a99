use crate::sheet::fetch::google_export_url;
use crate::sheet::{LoadError, LocalWorkbook, RemoteWorkbook, SheetSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://assethub.db?mode=rwc";
pub const DEFAULT_REFRESH_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkbookLocation {
    Remote(String),
    Local(PathBuf),
}

/// 运行配置：.env 加载后从环境变量读取
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub workbook: Option<WorkbookLocation>,
    pub sync_url: Option<String>,
    pub database_url: String,
    /// None 表示关闭自动刷新
    pub refresh_interval: Option<Duration>,
    pub llm_model: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // 本地文件优先于远程地址
        let workbook = get("SHEET_FILE")
            .map(|p| WorkbookLocation::Local(PathBuf::from(p)))
            .or_else(|| get("SHEET_XLSX_URL").map(WorkbookLocation::Remote))
            .or_else(|| get("SHEET_ID").map(|id| WorkbookLocation::Remote(google_export_url(&id))));

        let refresh_interval = match get("REFRESH_INTERVAL_SEC").map(|v| v.parse::<u64>()) {
            Some(Ok(0)) => None,
            Some(Ok(n)) => Some(Duration::from_secs(n)),
            Some(Err(_)) | None => Some(Duration::from_secs(DEFAULT_REFRESH_SECS)),
        };

        Self {
            workbook,
            sync_url: get("SHEET_SYNC_URL"),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            refresh_interval,
            llm_model: get("LLM_MODEL"),
        }
    }

    pub fn build_source(&self) -> Result<Option<Arc<dyn SheetSource>>, LoadError> {
        Ok(match &self.workbook {
            Some(WorkbookLocation::Local(p)) => Some(Arc::new(LocalWorkbook::new(p.clone()))),
            Some(WorkbookLocation::Remote(url)) => Some(Arc::new(RemoteWorkbook::new(url.clone())?)),
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = cfg(&[]);
        assert!(c.workbook.is_none());
        assert!(c.sync_url.is_none());
        assert_eq!(c.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(c.refresh_interval, Some(Duration::from_secs(DEFAULT_REFRESH_SECS)));
    }

    #[test]
    fn sheet_id_expands_to_export_url() {
        let c = cfg(&[("SHEET_ID", "abc"), ("SHEET_SYNC_URL", "  ")]);
        assert_eq!(
            c.workbook,
            Some(WorkbookLocation::Remote(
                "https://docs.google.com/spreadsheets/d/abc/export?format=xlsx".into()
            ))
        );
        assert!(c.sync_url.is_none());
    }

    #[test]
    fn local_file_wins_and_zero_disables_refresh() {
        let c = cfg(&[
            ("SHEET_FILE", "data/book.xlsx"),
            ("SHEET_XLSX_URL", "http://x"),
            ("REFRESH_INTERVAL_SEC", "0"),
        ]);
        assert_eq!(c.workbook, Some(WorkbookLocation::Local("data/book.xlsx".into())));
        assert_eq!(c.refresh_interval, None);
    }
}
