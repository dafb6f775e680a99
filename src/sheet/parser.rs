use crate::domain::record::{CellValue, Record, SheetData};
use crate::sheet::error::LoadError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::Timelike;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

const EMPTY_HEADER: &str = "__EMPTY";

/// 解析整个工作簿（xlsx / xls / ods），保持工作表顺序
pub fn parse_workbook(bytes: &[u8]) -> Result<Vec<SheetData>, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let mut sheets = Vec::new();
    for (name, range) in workbook.worksheets() {
        let sheet = sheet_from_rows(&name, range.rows());
        log::debug!("parsed sheet {} ({} rows)", sheet.name, sheet.rows.len());
        sheets.push(sheet);
    }
    Ok(sheets)
}

/// 首行为表头，其余为数据行；全空行丢弃
pub fn sheet_from_rows<'a, I>(name: &str, mut rows: I) -> SheetData
where
    I: Iterator<Item = &'a [Data]>,
{
    let Some(header_row) = rows.next() else {
        return SheetData::new(name, Vec::new());
    };
    let headers = header_names(header_row);

    let records = rows
        .map(|row| {
            let mut record = Record::new();
            for (idx, header) in headers.iter().enumerate() {
                let value = row.get(idx).map(cell_value).unwrap_or(CellValue::Empty);
                record.insert(header.clone(), value);
            }
            record
        })
        .filter(|r| !r.is_blank())
        .collect();

    SheetData::new(name, records)
}

/// 空表头 -> `__EMPTY`, `__EMPTY_1`…；重复表头追加 `_1`, `_2`…，跳过已被占用的名字
pub fn header_names(row: &[Data]) -> Vec<String> {
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();
    row.iter()
        .map(|cell| {
            let raw = cell_value(cell).text();
            let base = if raw.trim().is_empty() {
                EMPTY_HEADER.to_string()
            } else {
                raw.trim().to_string()
            };
            let name = if taken.contains(&base) {
                let n = counters.entry(base.clone()).or_insert(1);
                let mut candidate = format!("{base}_{n}");
                while taken.contains(&candidate) {
                    *n += 1;
                    candidate = format!("{base}_{n}");
                }
                *n += 1;
                candidate
            } else {
                base
            };
            taken.insert(name.clone());
            name
        })
        .collect()
}

pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) if d.num_seconds_from_midnight() == 0 => {
                CellValue::Text(d.format("%Y-%m-%d").to_string())
            }
            Some(d) => CellValue::Text(d.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#{e:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    #[test]
    fn blank_and_duplicate_headers_are_renamed() {
        let row = vec![s("NAME"), Data::Empty, s(" NAME "), s(""), s("NAME")];
        assert_eq!(
            header_names(&row),
            vec!["NAME", "__EMPTY", "NAME_1", "__EMPTY_1", "NAME_2"]
        );
    }

    #[test]
    fn renamed_headers_never_collide_with_existing_ones() {
        let row = vec![s("A"), s("A_1"), s("A"), s("A")];
        assert_eq!(header_names(&row), vec!["A", "A_1", "A_2", "A_3"]);

        let grid = vec![
            vec![s("A"), s("A_1"), s("A")],
            vec![s("x"), s("y"), s("z")],
        ];
        let sheet = sheet_from_rows("PABX", grid.iter().map(|r| r.as_slice()));
        let record = &sheet.rows[0];
        assert_eq!(record.len(), 3);
        assert_eq!(record.get("A_1").unwrap().text(), "y");
        assert_eq!(record.get("A_2").unwrap().text(), "z");
    }

    #[test]
    fn rows_keep_header_order_and_drop_blank_rows() {
        let grid = vec![
            vec![s("NO"), s("NAME"), s("NEXT_BAT")],
            vec![Data::Int(1), s("Site A"), s("2025-01-01")],
            vec![Data::Empty, s("   "), Data::Empty],
            vec![Data::Float(2.0), s("Site B")],
        ];
        let sheet = sheet_from_rows("CCTV", grid.iter().map(|r| r.as_slice()));
        assert_eq!(sheet.name, "CCTV");
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(
            sheet.rows[0].keys().collect::<Vec<_>>(),
            vec!["NO", "NAME", "NEXT_BAT"]
        );
        assert_eq!(sheet.rows[0].get("NO").unwrap().text(), "1");
        assert!(sheet.rows[1].get("NEXT_BAT").unwrap().is_blank());
    }

    #[test]
    fn empty_sheet_has_no_rows() {
        let grid: Vec<Vec<Data>> = Vec::new();
        let sheet = sheet_from_rows("PABX", grid.iter().map(|r| r.as_slice()));
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        assert!(matches!(
            parse_workbook(b"definitely not a workbook"),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn parses_workbook_fixture() {
        let bytes = include_bytes!("../../tests/fixtures/assets.xlsx");
        let sheets = parse_workbook(bytes).unwrap();
        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["PABX", "CCTV", "Notes"]);

        let pabx = &sheets[0];
        assert_eq!(pabx.rows.len(), 2);
        assert_eq!(
            pabx.rows[0].keys().collect::<Vec<_>>(),
            vec!["NO", "NAME", "NEXT_BAT", "A", "A_1", "A_2"]
        );
        assert_eq!(pabx.rows[0].get("NO").unwrap().text(), "1");
        assert_eq!(pabx.rows[0].get("NEXT_BAT").unwrap().text(), "2024-01-15");
        assert_eq!(pabx.rows[0].get("A_1").unwrap().text(), "y");
        assert_eq!(pabx.rows[0].get("A_2").unwrap().text(), "z");
        assert_eq!(pabx.rows[1].get("NAME").unwrap().text(), "Backup");
        assert_eq!(pabx.rows[1].get("NEXT_BAT").unwrap().text(), "2025-06-30");

        let cctv = &sheets[1];
        assert_eq!(
            cctv.rows[0].get("INS_DATE").unwrap().text(),
            "2024-01-15T12:00:00"
        );
    }
}
