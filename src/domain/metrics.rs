use crate::domain::category::CategoryConfig;
use crate::domain::due::{classify, DueStatus};
use crate::domain::record::{CellValue, Record, SheetData};
use crate::domain::resolve::resolve_field;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

pub const RENT_FIELD: &str = "RENT_YEAR";

fn leading_float_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?").expect("static regex")
    })
}

/// "1,200,000" / "1 200 000" -> 1200000；非数字记 0
pub fn parse_currency(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Number(_) | CellValue::Empty => 0.0,
        CellValue::Text(s) => {
            let clean: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
            leading_float_re()
                .find(&clean)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        }
    }
}

pub fn total_rows(sheet: &SheetData) -> usize {
    sheet.rows.len()
}

/// 指定列求和（列名大小写不敏感）
pub fn sum_currency(records: &[Record], field: &str) -> f64 {
    records
        .iter()
        .filter_map(|r| r.find(field).map(|(_, v)| parse_currency(v)))
        .sum()
}

pub fn critical_count(sheet: &SheetData, config: &CategoryConfig, now: NaiveDateTime) -> usize {
    let fields = config.due_fields_for(&sheet.name);
    sheet
        .rows
        .iter()
        .filter_map(|r| resolve_field(r, fields))
        .filter(|d| classify(d, now) == Some(DueStatus::Critical))
        .count()
}

/// 千分位格式，最多保留两位小数
pub fn format_grouped(n: f64) -> String {
    let negative = n < 0.0;
    let rounded = (n.abs() * 100.0).round() / 100.0;
    let int_part = rounded.trunc() as u64;
    let frac = ((rounded - rounded.trunc()) * 100.0).round() as u64;

    let digits = int_part.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if frac > 0 {
        let f = format!("{frac:02}");
        out.push('.');
        out.push_str(f.trim_end_matches('0'));
    }
    if negative && (int_part > 0 || frac > 0) {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn rent_sum_ignores_junk() {
        let rows: Vec<Record> = ["1,200,000", "", "abc", "500000"]
            .iter()
            .map(|v| Record::from_pairs([("RENT_YEAR", *v)]))
            .collect();
        assert_eq!(sum_currency(&rows, RENT_FIELD), 1_700_000.0);
    }

    #[test]
    fn rent_sum_matches_key_loosely_and_accepts_numbers() {
        let rows = vec![
            Record::from_pairs([(" rent_year", CellValue::Number(1000.5))]),
            Record::from_pairs([("Rent_Year", CellValue::from("2 000"))]),
            Record::from_pairs([("OTHER", CellValue::from("99"))]),
        ];
        assert_eq!(sum_currency(&rows, RENT_FIELD), 3000.5);
    }

    #[test]
    fn currency_parses_leading_number() {
        assert_eq!(parse_currency(&CellValue::from("12abc")), 12.0);
        assert_eq!(parse_currency(&CellValue::from("฿100")), 0.0);
        assert_eq!(parse_currency(&CellValue::Empty), 0.0);
        assert_eq!(parse_currency(&CellValue::from("-3.5")), -3.5);
    }

    #[test]
    fn counts_only_overdue_rows() {
        let now = NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let past = (now - Duration::days(3)).format("%Y-%m-%d").to_string();
        let soon = (now + Duration::days(10)).format("%Y-%m-%d").to_string();
        let sheet = SheetData::new(
            "CCTV",
            vec![
                Record::from_pairs([("NEXT_BAT", past.as_str())]),
                Record::from_pairs([("next_bat", soon.as_str())]),
                Record::from_pairs([("NEXT_BAT", "garbage")]),
                Record::from_pairs([("NAME", "no date")]),
            ],
        );
        assert_eq!(total_rows(&sheet), 4);
        assert_eq!(critical_count(&sheet, &CategoryConfig::default(), now), 1);
    }

    #[test]
    fn grouped_format() {
        assert_eq!(format_grouped(1_700_000.0), "1,700,000");
        assert_eq!(format_grouped(999.0), "999");
        assert_eq!(format_grouped(1234.5), "1,234.5");
        assert_eq!(format_grouped(0.0), "0");
        assert_eq!(format_grouped(-1000.0), "-1,000");
    }
}
