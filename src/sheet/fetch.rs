use crate::domain::record::SheetData;
use crate::http::build_http_client;
use crate::sheet::error::LoadError;
use crate::sheet::loader::SheetSource;
use crate::sheet::parser::parse_workbook;
use async_trait::async_trait;
use log::info;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Sheets 的 xlsx 导出地址
pub fn google_export_url(sheet_id: &str) -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=xlsx",
        sheet_id.trim()
    )
}

/// 追加 `refresh_id` 与 `t`，绕过中间缓存
pub fn cache_busted_url(base: &str, refresh_id: &str, millis: i64) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}refresh_id={refresh_id}&t={millis}")
}

pub struct RemoteWorkbook {
    client: reqwest::Client,
    url: String,
}

impl RemoteWorkbook {
    pub fn new(url: impl Into<String>) -> Result<Self, LoadError> {
        Ok(Self {
            client: build_http_client(FETCH_TIMEOUT)?,
            url: url.into(),
        })
    }

    fn request_url(&self) -> String {
        let refresh_id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(13)
            .map(char::from)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        cache_busted_url(&self.url, &refresh_id, chrono::Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl SheetSource for RemoteWorkbook {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<SheetData>, LoadError> {
        let resp = self
            .client
            .get(self.request_url())
            .header("Pragma", "no-cache")
            .header("Cache-Control", "no-cache")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }

        let bytes = resp.bytes().await?;
        info!("downloaded workbook: {} bytes", bytes.len());
        parse_workbook(&bytes)
    }
}

/// 本地工作簿文件（离线使用）
pub struct LocalWorkbook {
    path: PathBuf,
}

impl LocalWorkbook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SheetSource for LocalWorkbook {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<SheetData>, LoadError> {
        let bytes = tokio::fs::read(&self.path).await?;
        parse_workbook(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_url_and_cache_busting() {
        let base = google_export_url(" abc123 ");
        assert_eq!(
            base,
            "https://docs.google.com/spreadsheets/d/abc123/export?format=xlsx"
        );
        assert_eq!(
            cache_busted_url(&base, "k9", 42),
            format!("{base}&refresh_id=k9&t=42")
        );
        assert_eq!(
            cache_busted_url("http://host/book.xlsx", "k9", 42),
            "http://host/book.xlsx?refresh_id=k9&t=42"
        );
    }

    #[test]
    fn request_urls_differ_per_call() {
        let remote = RemoteWorkbook::new("http://host/book.xlsx").unwrap();
        let a = remote.request_url();
        let b = remote.request_url();
        assert!(a.starts_with("http://host/book.xlsx?refresh_id="));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn missing_local_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = LocalWorkbook::new(dir.path().join("nope.xlsx"));
        assert!(matches!(src.fetch().await, Err(LoadError::Io(_))));
    }
}
