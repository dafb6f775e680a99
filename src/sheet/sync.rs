use crate::domain::record::Record;
use crate::http::build_http_client;
use crate::sheet::error::SyncError;
use chrono::{SecondsFormat, Utc};
use log::info;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Insert,
    Delete,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Insert => "INSERT",
            SyncAction::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload<'a> {
    pub action: &'static str,
    pub sheet_name: String,
    pub id: String,
    pub data: &'a Record,
    pub timestamp: String,
}

/// NAME 或 ID 列的值，否则取第一列
pub fn row_id(record: &Record) -> String {
    record
        .iter()
        .find(|(k, _)| {
            let k = k.to_uppercase();
            k == "NAME" || k == "ID"
        })
        .or_else(|| record.iter().next())
        .map(|(_, v)| v.text().trim().to_string())
        .unwrap_or_default()
}

pub fn build_payload<'a>(action: SyncAction, sheet_name: &str, record: &'a Record) -> SyncPayload<'a> {
    SyncPayload {
        action: action.as_str(),
        sheet_name: sheet_name.trim().to_string(),
        id: row_id(record),
        data: record,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Apps Script 风格的写回端点；未配置时所有操作为空操作
pub struct SheetSync {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl SheetSync {
    pub fn new(endpoint: Option<String>) -> Result<Self, SyncError> {
        Ok(Self {
            client: build_http_client(Duration::from_secs(20))?,
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// 返回 false 表示未配置端点、未发送
    pub async fn push(
        &self,
        action: SyncAction,
        sheet_name: &str,
        record: &Record,
    ) -> Result<bool, SyncError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(false);
        };
        let payload = build_payload(action, sheet_name, record);
        let body = serde_json::to_string(&payload)?;
        info!("[{}] {} id={}", payload.action, payload.sheet_name, payload.id);

        let resp = self
            .client
            .post(endpoint)
            .header("Content-Type", "text/plain;charset=utf-8")
            .header("Cache-Control", "no-cache")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() && !status.is_redirection() {
            return Err(SyncError::Status(status.as_u16()));
        }
        Ok(true)
    }
}
