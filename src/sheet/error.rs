#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("no workbook source configured (set SHEET_XLSX_URL, SHEET_ID or SHEET_FILE)")]
    NoSource,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("fetch failed: {0}")]
    Status(u16),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("workbook parse failed: {0}")]
    Parse(String),
    #[error("snapshot store error: {0}")]
    Snapshot(String),
    #[error("ไม่สามารถโหลดข้อมูลได้และไม่มีข้อมูลสำรอง ({source})")]
    Unavailable { source: Box<LoadError> },
}

impl From<calamine::Error> for LoadError {
    fn from(e: calamine::Error) -> Self {
        LoadError::Parse(e.to_string())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sync endpoint returned {0}")]
    Status(u16),
    #[error("payload encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}
