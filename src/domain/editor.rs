use crate::domain::record::{CellValue, Record, SheetData};
use crate::domain::resolve::is_present;
use crate::domain::table_view::headers;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RowEditError {
    #[error("กรุณาระบุ 'NAME' เพื่อใช้เป็นชื่ออ้างอิงหลัก")]
    MissingName,
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("invalid assignment: {0} (expected KEY=VALUE)")]
    BadAssignment(String),
}

/// 新行模板：所有列置空，NO 列取现有最大值 + 1
pub fn new_row_template(sheet: &SheetData) -> Record {
    let mut columns: Vec<String> = sheet
        .rows
        .first()
        .map(|r| r.keys().map(|k| k.to_string()).collect())
        .unwrap_or_default();
    if columns.is_empty() {
        columns = headers(sheet);
    }

    let mut row = Record::new();
    for col in columns {
        if col.trim().eq_ignore_ascii_case("NO") {
            let max_no = sheet
                .rows
                .iter()
                .filter_map(|r| r.get(&col))
                .filter_map(|v| v.text().trim().parse::<i64>().ok())
                .max()
                .unwrap_or(0)
                .max(0);
            row.insert(col, (max_no + 1).to_string());
        } else {
            row.insert(col, CellValue::from(""));
        }
    }
    row
}

/// 解析 `KEY=VALUE` 列表写入模板；列名按大小写不敏感匹配已有列
pub fn apply_assignments(row: &mut Record, assignments: &[String]) -> Result<(), RowEditError> {
    for a in assignments {
        let (key, value) = a
            .split_once('=')
            .ok_or_else(|| RowEditError::BadAssignment(a.clone()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(RowEditError::BadAssignment(a.clone()));
        }
        let target = match row.find(key) {
            Some((existing, _)) => existing.to_string(),
            None if row.is_empty() => key.to_string(),
            None => return Err(RowEditError::UnknownColumn(key.to_string())),
        };
        row.insert(target, value.trim().to_string());
    }
    Ok(())
}

pub fn validate_row(row: &Record) -> Result<(), RowEditError> {
    let name = row.find("NAME").map(|(_, v)| v.text()).unwrap_or_default();
    if is_present(&name) {
        Ok(())
    } else {
        Err(RowEditError::MissingName)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SheetData {
        SheetData::new(
            "PABX",
            vec![
                Record::from_pairs([("NO", "3"), ("NAME", "A"), ("NEXT_BAT", "2025-01-01")]),
                Record::from_pairs([("NO", "x"), ("NAME", "B"), ("NEXT_BAT", "")]),
                Record::from_pairs([("NO", "7"), ("NAME", "C"), ("NEXT_BAT", "")]),
            ],
        )
    }

    #[test]
    fn template_increments_no() {
        let row = new_row_template(&sheet());
        assert_eq!(row.get("NO").unwrap().text(), "8");
        assert_eq!(row.get("NAME").unwrap().text(), "");
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["NO", "NAME", "NEXT_BAT"]);
    }

    #[test]
    fn assignments_match_existing_columns() {
        let mut row = new_row_template(&sheet());
        apply_assignments(&mut row, &["name=New Site".into(), "Next_Bat=2026-02-02".into()])
            .unwrap();
        assert_eq!(row.get("NAME").unwrap().text(), "New Site");
        assert_eq!(row.get("NEXT_BAT").unwrap().text(), "2026-02-02");
        assert!(validate_row(&row).is_ok());

        let err = apply_assignments(&mut row, &["COLOR=red".into()]).unwrap_err();
        assert_eq!(err, RowEditError::UnknownColumn("COLOR".into()));
        let err = apply_assignments(&mut row, &["oops".into()]).unwrap_err();
        assert!(matches!(err, RowEditError::BadAssignment(_)));
    }

    #[test]
    fn name_is_required() {
        let row = new_row_template(&sheet());
        assert_eq!(validate_row(&row), Err(RowEditError::MissingName));
    }
}
