use crate::domain::category::{filter_and_sort, CategoryConfig};
use crate::domain::record::SheetData;
use crate::sheet::error::LoadError;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use log::{error, info, warn};
use std::sync::Arc;

/// 工作簿来源：远程导出地址或本地文件
#[async_trait]
pub trait SheetSource: Send + Sync {
    fn describe(&self) -> String;
    async fn fetch(&self) -> Result<Vec<SheetData>, LoadError>;
}

/// 最近一次成功加载的完整快照
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, sheets: &[SheetData]) -> Result<(), LoadError>;
    async fn restore(&self) -> Result<Option<Vec<SheetData>>, LoadError>;
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// 已过滤并排序的工作集
    pub sheets: Vec<SheetData>,
    pub from_cache: bool,
    /// 回退到快照时的原始错误
    pub fetch_error: Option<String>,
    pub loaded_at: DateTime<Local>,
}

pub struct SheetLoader {
    source: Option<Arc<dyn SheetSource>>,
    store: Arc<dyn SnapshotStore>,
    categories: CategoryConfig,
}

impl SheetLoader {
    pub fn new(
        source: Option<Arc<dyn SheetSource>>,
        store: Arc<dyn SnapshotStore>,
        categories: CategoryConfig,
    ) -> Self {
        Self {
            source,
            store,
            categories,
        }
    }

    pub fn categories(&self) -> &CategoryConfig {
        &self.categories
    }

    /// 拉取 -> 保存快照；失败时整体恢复快照；两者都失败返回错误
    pub async fn load(&self) -> Result<LoadOutcome, LoadError> {
        let fetched = match &self.source {
            Some(src) => {
                info!("loading workbook from {}", src.describe());
                src.fetch().await
            }
            None => Err(LoadError::NoSource),
        };

        match fetched {
            Ok(sheets) => {
                // 空工作簿不覆盖已有快照
                if !sheets.is_empty() {
                    if let Err(e) = self.store.save(&sheets).await {
                        warn!("snapshot save failed: {}", e);
                    }
                }
                let sheets = filter_and_sort(sheets, &self.categories);
                info!("loaded {} sheets from source", sheets.len());
                Ok(LoadOutcome {
                    sheets,
                    from_cache: false,
                    fetch_error: None,
                    loaded_at: Local::now(),
                })
            }
            Err(fetch_err) => {
                warn!("fetch failed, trying snapshot: {}", fetch_err);
                match self.store.restore().await {
                    Ok(Some(sheets)) => Ok(LoadOutcome {
                        sheets: filter_and_sort(sheets, &self.categories),
                        from_cache: true,
                        fetch_error: Some(fetch_err.to_string()),
                        loaded_at: Local::now(),
                    }),
                    Ok(None) => Err(LoadError::Unavailable {
                        source: Box::new(fetch_err),
                    }),
                    Err(store_err) => {
                        error!("snapshot restore failed: {}", store_err);
                        Err(LoadError::Unavailable {
                            source: Box::new(fetch_err),
                        })
                    }
                }
            }
        }
    }
}
