use crate::domain::assets::{tally_record, AssetDistribution};
use crate::domain::category::{is_radio_sheet, CategoryConfig};
use crate::domain::due::{classify_parsed, parse_date, DueStatus, MonthlyProjection};
use crate::domain::metrics::{sum_currency, RENT_FIELD};
use crate::domain::naming::display_name;
use crate::domain::record::SheetData;
use crate::domain::resolve::resolve_field;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusBucket {
    pub count: usize,
    pub names: Vec<String>,
}

/// 一张表的完整统计：到期分桶、月度预测、设备分布、汇总指标
#[derive(Debug, Clone)]
pub struct SheetSummary {
    pub sheet_name: String,
    pub total_rows: usize,
    pub critical: StatusBucket,
    pub warning: StatusBucket,
    pub normal: StatusBucket,
    /// 有到期日但无法解析的行数
    pub unclassified: usize,
    pub projection: MonthlyProjection,
    /// 仅无线电表有值
    pub assets: Option<AssetDistribution>,
    pub rent_total: Option<f64>,
}

impl SheetSummary {
    pub fn bucket(&self, status: DueStatus) -> &StatusBucket {
        match status {
            DueStatus::Critical => &self.critical,
            DueStatus::Warning => &self.warning,
            DueStatus::Normal => &self.normal,
        }
    }

    fn bucket_mut(&mut self, status: DueStatus) -> &mut StatusBucket {
        match status {
            DueStatus::Critical => &mut self.critical,
            DueStatus::Warning => &mut self.warning,
            DueStatus::Normal => &mut self.normal,
        }
    }

    pub fn critical_count(&self) -> usize {
        self.critical.count
    }

    /// 饼图数据：跳过空桶
    pub fn status_slices(&self) -> Vec<(DueStatus, &StatusBucket)> {
        DueStatus::ALL
            .iter()
            .map(|s| (*s, self.bucket(*s)))
            .filter(|(_, b)| b.count > 0)
            .collect()
    }
}

/// 单次遍历计算整张表的统计；不缓存，调用方每次刷新重新计算
pub fn summarize(sheet: &SheetData, config: &CategoryConfig, now: NaiveDateTime) -> SheetSummary {
    let radio = is_radio_sheet(&sheet.name);
    let due_fields = config.due_fields_for(&sheet.name);

    let mut summary = SheetSummary {
        sheet_name: sheet.name.clone(),
        total_rows: sheet.rows.len(),
        critical: StatusBucket::default(),
        warning: StatusBucket::default(),
        normal: StatusBucket::default(),
        unclassified: 0,
        projection: MonthlyProjection::default(),
        assets: radio.then(AssetDistribution::default),
        rent_total: radio.then(|| sum_currency(&sheet.rows, RENT_FIELD)),
    };

    for record in &sheet.rows {
        let name = display_name(record, &sheet.name);

        if let Some(raw) = resolve_field(record, due_fields) {
            match parse_date(&raw) {
                Some(due) => {
                    let bucket = summary.bucket_mut(classify_parsed(due, now));
                    bucket.count += 1;
                    bucket.names.push(name.clone());
                    summary.projection.add(due, &name);
                }
                None => summary.unclassified += 1,
            }
        }

        if let Some(dist) = summary.assets.as_mut() {
            tally_record(dist, record, &name);
        }
    }

    summary
}

pub fn summarize_all(
    sheets: &[SheetData],
    config: &CategoryConfig,
    now: NaiveDateTime,
) -> Vec<SheetSummary> {
    sheets.iter().map(|s| summarize(s, config, now)).collect()
}
