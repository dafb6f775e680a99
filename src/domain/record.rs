use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 单元格取值：只区分文本、数字和空三种
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    pub fn text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Empty => String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
            CellValue::Empty => true,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Trim + uppercase, used for every header comparison.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

/// 一行数据：保持列顺序的 key/value 列表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut r = Record::new();
        for (k, v) in pairs {
            r.insert(k, v);
        }
        r
    }

    /// Replaces the value when the exact key already exists, otherwise appends.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<CellValue> {
        let idx = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// 大小写、首尾空白不敏感的列查找，返回第一个匹配列
    pub fn find(&self, key: &str) -> Option<(&str, &CellValue)> {
        let wanted = normalize_key(key);
        self.fields
            .iter()
            .find(|(k, _)| normalize_key(k) == wanted)
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 所有单元格去空白后均为空
    pub fn is_blank(&self) -> bool {
        self.values().all(|v| v.is_blank())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object of cell values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, CellValue>()? {
            fields.push((k, v));
        }
        Ok(Record { fields })
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Record, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

/// 一个工作表：名称 + 有序行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetData {
    pub name: String,
    pub rows: Vec<Record>,
}

impl SheetData {
    pub fn new(name: impl Into<String>, rows: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_ignores_case_and_whitespace() {
        let r = Record::from_pairs([(" next_bat ", "2024-01-01"), ("NAME", "A")]);
        let (key, value) = r.find("NEXT_BAT").unwrap();
        assert_eq!(key, " next_bat ");
        assert_eq!(value.text(), "2024-01-01");
        assert!(r.find("NEXTB_BAT").is_none());
    }

    #[test]
    fn json_keeps_column_order() {
        let r = Record::from_pairs([
            ("ZETA", CellValue::from("z")),
            ("ALPHA", CellValue::Number(3.0)),
            ("MID", CellValue::Empty),
        ]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"ZETA":"z","ALPHA":3.0,"MID":null}"#);

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back.keys().collect::<Vec<_>>(), vec!["ZETA", "ALPHA", "MID"]);
        assert_eq!(back, r);
    }

    #[test]
    fn number_text_drops_trailing_zero() {
        assert_eq!(CellValue::Number(2.0).text(), "2");
        assert_eq!(CellValue::Number(2.5).text(), "2.5");
        assert!(CellValue::Text("  ".into()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }
}
