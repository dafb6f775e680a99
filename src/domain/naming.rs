use crate::domain::category::{is_cctv_sheet, is_radio_sheet};
use crate::domain::record::{normalize_key, Record};
use crate::domain::resolve::is_present;

pub const UNNAMED: &str = "ไม่ระบุชื่อ";

const PRIORITY_KEYS: [&str; 15] = [
    "NAME",
    "RENT_TOWER",
    "TOWER_NO1",
    "AREA_PEA",
    "STATION",
    "SITE",
    "STATION_NAME",
    "SITE_NAME",
    "ชื่อสถานี",
    "จุดติดตั้ง",
    "สถานที่",
    "สถานี",
    "ชื่อ",
    "UPS",
    "PABX",
];

const PARTIAL_KEYS: [&str; 7] = ["ชื่อ", "NAME", "SITE", "STATION", "จุด", "ที่ตั้ง", "AREA"];

// 每个 key 只看第一个匹配列（与表头查找一致）
fn exact(record: &Record, key: &str) -> Option<String> {
    let (_, v) = record.find(key)?;
    let text = v.text();
    is_present(&text).then(|| text.trim().to_string())
}

fn partial(record: &Record, part: &str) -> Option<String> {
    let part = part.to_uppercase();
    let (_, v) = record.iter().find(|(k, _)| normalize_key(k).contains(&part))?;
    let text = v.text();
    is_present(&text).then(|| text.trim().to_string())
}

/// 用于图表明细和下钻列表的设备显示名
pub fn display_name(record: &Record, sheet_name: &str) -> String {
    let primary = PRIORITY_KEYS
        .iter()
        .find_map(|k| exact(record, k))
        .or_else(|| PARTIAL_KEYS.iter().find_map(|p| partial(record, p)))
        .unwrap_or_else(|| UNNAMED.to_string());

    let suffix = if is_radio_sheet(sheet_name) {
        record
            .find("AREA_PEA")
            .map(|(_, v)| v.text())
            .filter(|area| *area != primary)
    } else if is_cctv_sheet(sheet_name) {
        record.find("BUILDING_VR").map(|(_, v)| v.text())
    } else {
        None
    };

    match suffix.map(|s| s.trim().to_string()) {
        Some(s) if is_present(&s) => format!("{primary} ({s})"),
        _ => primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_key_beats_column_order() {
        let r = Record::from_pairs([("SITE", "Site A"), ("name", "Main Gate")]);
        assert_eq!(display_name(&r, "PABX"), "Main Gate");
    }

    #[test]
    fn skips_blank_and_dash_names() {
        let r = Record::from_pairs([("NAME", "-"), ("STATION", "Bang Pakong")]);
        assert_eq!(display_name(&r, "PABX"), "Bang Pakong");
    }

    #[test]
    fn falls_back_to_partial_then_placeholder() {
        let r = Record::from_pairs([("LOCATION_AREA", "Zone 3")]);
        assert_eq!(display_name(&r, "PABX"), "Zone 3");
        let empty = Record::from_pairs([("QTY", "2")]);
        assert_eq!(display_name(&empty, "PABX"), UNNAMED);
    }

    #[test]
    fn radio_appends_area_unless_same() {
        let r = Record::from_pairs([("RENT_TOWER", "AIS"), ("AREA_PEA", "กฟฟ.ชลบุรี")]);
        assert_eq!(display_name(&r, "DIGITAL RADIO"), "AIS (กฟฟ.ชลบุรี)");

        let same = Record::from_pairs([("AREA_PEA", "Rayong")]);
        assert_eq!(display_name(&same, "DIGITAL RADIO"), "Rayong");
    }

    #[test]
    fn cctv_appends_building() {
        let r = Record::from_pairs([("NAME", "Cam 1"), ("BUILDING_VR", "B2")]);
        assert_eq!(display_name(&r, "CCTV"), "Cam 1 (B2)");
        let dash = Record::from_pairs([("NAME", "Cam 2"), ("BUILDING_VR", "-")]);
        assert_eq!(display_name(&dash, "CCTV"), "Cam 2");
    }
}
