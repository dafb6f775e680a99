use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// 预警窗口：到期前 60 天进入 Warning
pub const WARNING_WINDOW_DAYS: i64 = 60;

/// 月度预测最多保留的月份数
pub const PROJECTION_MONTHS: usize = 12;

/// 泰历（佛历）年份偏移
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DueStatus {
    Critical,
    Warning,
    Normal,
}

impl DueStatus {
    pub const ALL: [DueStatus; 3] = [DueStatus::Critical, DueStatus::Warning, DueStatus::Normal];

    pub fn label(&self) -> &'static str {
        match self {
            DueStatus::Critical => "เลยกำหนด (วิกฤต)",
            DueStatus::Warning => "ใกล้กำหนด (เฝ้าระวัง)",
            DueStatus::Normal => "สถานะปกติ",
        }
    }
}

fn us_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})(?:[ ,]+(\d{1,2}):(\d{2})(?::(\d{2}))?)?$")
            .expect("static regex")
    })
}

/// 通用日期解析：ISO / RFC3339 / 美式 M/D/Y / 英文月份
///
/// Date-only inputs resolve to local midnight. Returns `None` for anything
/// the formats below do not cover.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%b %d, %Y", "%B %d, %Y", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    let caps = us_date_re().captures(s)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if caps[3].len() == 2 {
        // 两位年份：00-49 -> 20xx，50-99 -> 19xx
        year += if year < 50 { 2000 } else { 1900 };
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let hour: u32 = caps.get(4).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let min: u32 = caps.get(5).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let sec: u32 = caps.get(6).map_or(Some(0), |m| m.as_str().parse().ok())?;
    date.and_hms_opt(hour, min, sec)
}

/// Classifies a resolved due date against `now`.
///
/// Both thresholds compare with strict `<`: a date equal to `now` is
/// `Warning`, a date equal to `now + 60 days` is `Normal`.
pub fn classify(due: &str, now: NaiveDateTime) -> Option<DueStatus> {
    parse_date(due).map(|d| classify_parsed(d, now))
}

pub fn classify_parsed(due: NaiveDateTime, now: NaiveDateTime) -> DueStatus {
    let window_end = now + Duration::days(WARNING_WINDOW_DAYS);
    if due < now {
        DueStatus::Critical
    } else if due < window_end {
        DueStatus::Warning
    } else {
        DueStatus::Normal
    }
}

/// DD/MM/(year+543)；无法解析时原样返回，空值返回 "-"
pub fn format_thai_date(raw: &str) -> String {
    if raw.trim().is_empty() {
        return "-".to_string();
    }
    match parse_date(raw) {
        Some(d) => format!(
            "{:02}/{:02}/{}",
            d.day(),
            d.month(),
            d.year() + BUDDHIST_ERA_OFFSET
        ),
        None => raw.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(d: NaiveDateTime) -> Self {
        Self {
            year: d.year(),
            month: d.month(),
        }
    }

    /// MM/พ.ศ.
    pub fn label(&self) -> String {
        format!("{:02}/{}", self.month, self.year + BUDDHIST_ERA_OFFSET)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionBucket {
    pub key: MonthKey,
    pub count: usize,
    pub names: Vec<String>,
}

impl ProjectionBucket {
    pub fn label(&self) -> String {
        self.key.label()
    }
}

/// 月度更换预测直方图（按公历年月累计）
#[derive(Debug, Clone, Default)]
pub struct MonthlyProjection {
    buckets: BTreeMap<MonthKey, (usize, Vec<String>)>,
}

impl MonthlyProjection {
    pub fn add(&mut self, due: NaiveDateTime, name: &str) {
        let slot = self.buckets.entry(MonthKey::of(due)).or_default();
        slot.0 += 1;
        slot.1.push(name.to_string());
    }

    /// 最早的 12 个月份，按时间升序
    pub fn series(&self) -> Vec<ProjectionBucket> {
        self.buckets
            .iter()
            .take(PROJECTION_MONTHS)
            .map(|(k, (count, names))| ProjectionBucket {
                key: *k,
                count: *count,
                names: names.clone(),
            })
            .collect()
    }

    pub fn distinct_months(&self) -> usize {
        self.buckets.len()
    }
}
