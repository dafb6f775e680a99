use crate::domain::record::SheetData;

/// 识别的设备类别，按显示优先级排列
pub const TARGET_ORDER: [&str; 3] = ["CCTV", "PABX", "DIGITAL RADIO"];

/// 无线电表的到期日候选列（按优先级）
pub const RADIO_DUE_FIELDS: [&str; 3] = ["NEXTB_BAT", "NEXTF_BAT", "NEXTH_BAT"];

/// 其他表的到期日候选列（按优先级）
pub const DEFAULT_DUE_FIELDS: [&str; 6] = [
    "NEXT_BAT",
    "NEXTB_BAT",
    "NEXTF_BAT",
    "NEXTH_BAT",
    "NEXT_BAT_CCTV",
    "NEXT_BAT_PABX",
];

/// Category names and due-date fallback chains, injected where needed.
#[derive(Debug, Clone)]
pub struct CategoryConfig {
    pub categories: Vec<String>,
    pub radio_due_fields: Vec<String>,
    pub default_due_fields: Vec<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            categories: TARGET_ORDER.iter().map(|s| s.to_string()).collect(),
            radio_due_fields: RADIO_DUE_FIELDS.iter().map(|s| s.to_string()).collect(),
            default_due_fields: DEFAULT_DUE_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CategoryConfig {
    pub fn due_fields_for(&self, sheet_name: &str) -> &[String] {
        if is_radio_sheet(sheet_name) {
            &self.radio_due_fields
        } else {
            &self.default_due_fields
        }
    }

    fn position(&self, sheet_name: &str) -> Option<usize> {
        let name = sheet_name.trim().to_lowercase();
        self.categories
            .iter()
            .position(|c| c.trim().to_lowercase() == name)
    }
}

pub fn is_radio_sheet(sheet_name: &str) -> bool {
    sheet_name.to_uppercase().contains("RADIO")
}

pub fn is_cctv_sheet(sheet_name: &str) -> bool {
    sheet_name.to_uppercase().contains("CCTV")
}

/// 只保留三类设备表，并按固定顺序排列；未识别的表直接丢弃
pub fn filter_and_sort(sheets: Vec<SheetData>, config: &CategoryConfig) -> Vec<SheetData> {
    let mut kept: Vec<(usize, SheetData)> = sheets
        .into_iter()
        .filter_map(|s| config.position(&s.name).map(|idx| (idx, s)))
        .collect();
    // stable: 同名表保持源顺序
    kept.sort_by_key(|(idx, _)| *idx);
    kept.into_iter().map(|(_, s)| s).collect()
}
