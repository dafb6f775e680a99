use crate::domain::category::CategoryConfig;
use crate::domain::due::{classify, format_thai_date, DueStatus};
use crate::domain::metrics::{format_grouped, parse_currency, RENT_FIELD};
use crate::domain::record::{normalize_key, CellValue, Record, SheetData};
use crate::domain::resolve::resolve_field;
use chrono::NaiveDateTime;

/// 电池数量列，虽含 BAT 但不是日期
const BATTERY_QTY_COLUMNS: [&str; 4] = ["N_BAT", "NB_BAT", "NF_BAT", "NH_BAT"];

/// 以第一行的列顺序作为表头；跳过空列名、内部列（_ 开头）和序号列
pub fn headers(sheet: &SheetData) -> Vec<String> {
    let Some(first) = sheet.rows.first() else {
        return Vec::new();
    };
    first
        .keys()
        .filter(|k| {
            let n = normalize_key(k);
            !n.is_empty() && !k.starts_with('_') && n != "NO" && n != "NO."
        })
        .map(|k| k.to_string())
        .collect()
}

/// 任一单元格包含关键字（大小写不敏感）即命中；空查询返回全部
pub fn search<'a>(rows: &'a [Record], query: &str) -> Vec<&'a Record> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return rows.iter().collect();
    }
    rows.iter()
        .filter(|r| r.values().any(|v| v.text().to_lowercase().contains(&q)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Money,
    Plain,
}

pub fn column_kind(header: &str) -> ColumnKind {
    let upper = header.to_uppercase();
    let is_qty = BATTERY_QTY_COLUMNS.contains(&upper.as_str());
    if !is_qty && (upper.contains("BAT") || upper.contains("DATE")) {
        ColumnKind::Date
    } else if upper.contains(RENT_FIELD) {
        ColumnKind::Money
    } else {
        ColumnKind::Plain
    }
}

pub fn format_cell(header: &str, value: Option<&CellValue>) -> String {
    let value = value.cloned().unwrap_or(CellValue::Empty);
    if value.is_blank() {
        return "-".to_string();
    }
    match column_kind(header) {
        ColumnKind::Date => format_thai_date(&value.text()),
        ColumnKind::Money => format_grouped(parse_currency(&value)),
        ColumnKind::Plain => value.text(),
    }
}

/// 行的到期状态；无到期日或无法解析时为 None
pub fn row_status(
    record: &Record,
    sheet_name: &str,
    config: &CategoryConfig,
    now: NaiveDateTime,
) -> Option<DueStatus> {
    let due = resolve_field(record, config.due_fields_for(sheet_name))?;
    classify(&due, now)
}

#[derive(Debug, Clone)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub overdue: bool,
}

/// 生成表格视图：搜索过滤 + 单元格格式化
pub fn build_rows(
    sheet: &SheetData,
    query: &str,
    config: &CategoryConfig,
    now: NaiveDateTime,
) -> (Vec<String>, Vec<TableRow>) {
    let headers = headers(sheet);
    let rows = search(&sheet.rows, query)
        .into_iter()
        .map(|r| TableRow {
            cells: headers.iter().map(|h| format_cell(h, r.get(h))).collect(),
            overdue: row_status(r, &sheet.name, config, now) == Some(DueStatus::Critical),
        })
        .collect();
    (headers, rows)
}
