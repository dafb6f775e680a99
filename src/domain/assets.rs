use crate::domain::naming::display_name;
use crate::domain::record::Record;
use crate::domain::resolve::{raw_field, resolve_field};
use log::warn;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    BaseStation,
    FixedRadio,
    MobileRadio,
    Handheld,
    Tower,
}

impl AssetKind {
    /// 图表输出顺序
    pub const ORDER: [AssetKind; 5] = [
        AssetKind::BaseStation,
        AssetKind::FixedRadio,
        AssetKind::MobileRadio,
        AssetKind::Handheld,
        AssetKind::Tower,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::BaseStation => "Base Station",
            AssetKind::FixedRadio => "Fixed Radio",
            AssetKind::MobileRadio => "Mobile Radio",
            AssetKind::Handheld => "Handheld",
            AssetKind::Tower => "Tower (เสา)",
        }
    }

    /// 可接受的列名拼写（Tower 走独立的两个槽位）
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            AssetKind::BaseStation => &["BASE_STATION", "BASE STATION"],
            AssetKind::FixedRadio => &["FIXED RADIO", "FIXED_RADIO"],
            AssetKind::MobileRadio => &["MOBILE RADIO", "MOBILE_RADIO"],
            AssetKind::Handheld => &["HANHELD", "HANDHELD"],
            AssetKind::Tower => &[],
        }
    }
}

/// 单元格数量上限，超出按上限计
pub const MAX_UNIT_QUANTITY: usize = 1000;

const TOWER_SLOTS: [(&str, &str); 2] = [("TOWER_NO1", "T1"), ("TOWER_NO2", "T2")];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetTally {
    pub count: usize,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetBar {
    pub kind: AssetKind,
    pub count: usize,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AssetDistribution {
    tallies: [AssetTally; 5],
}

impl AssetDistribution {
    fn slot(kind: AssetKind) -> usize {
        AssetKind::ORDER
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default()
    }

    pub fn get(&self, kind: AssetKind) -> &AssetTally {
        &self.tallies[Self::slot(kind)]
    }

    fn push(&mut self, kind: AssetKind, name: String) {
        let t = &mut self.tallies[Self::slot(kind)];
        t.count += 1;
        t.names.push(name);
    }

    /// 按固定顺序输出，数量为 0 的类别省略
    pub fn bars(&self) -> Vec<AssetBar> {
        AssetKind::ORDER
            .iter()
            .map(|k| (k, self.get(*k)))
            .filter(|(_, t)| t.count > 0)
            .map(|(k, t)| AssetBar {
                kind: *k,
                count: t.count,
                names: t.names.clone(),
            })
            .collect()
    }

    pub fn total(&self) -> usize {
        self.tallies.iter().map(|t| t.count).sum()
    }
}

/// "0" / "-" / "nan" / 空 均不计数
pub fn is_valid_quantity(value: &str) -> bool {
    let s = value.trim();
    !(s.is_empty() || s == "-" || s == "0" || s.eq_ignore_ascii_case("nan"))
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.\d+)?$").expect("static regex"))
}

/// 纯数字取整数部分（不超过 `MAX_UNIT_QUANTITY`），其它有效文本（如 "2 ชุด"）记 1
pub fn quantity_of(value: &str) -> usize {
    let s = value.trim();
    if numeric_re().is_match(s) {
        if let Ok(n) = s.parse::<f64>() {
            if n > 0.0 {
                let n = n.floor();
                if n > MAX_UNIT_QUANTITY as f64 {
                    warn!("quantity {} capped at {}", s, MAX_UNIT_QUANTITY);
                    return MAX_UNIT_QUANTITY;
                }
                return n as usize;
            }
        }
    }
    1
}

/// 单条记录对分布的贡献
pub fn tally_record(dist: &mut AssetDistribution, record: &Record, name: &str) {
    for (column, tag) in TOWER_SLOTS {
        if raw_field(record, column).is_some_and(|v| is_valid_quantity(&v)) {
            dist.push(AssetKind::Tower, format!("{name} ({tag})"));
        }
    }

    for kind in AssetKind::ORDER {
        if kind == AssetKind::Tower {
            continue;
        }
        let Some(value) = resolve_field(record, kind.columns()) else {
            continue;
        };
        if !is_valid_quantity(&value) {
            continue;
        }
        let qty = quantity_of(&value);
        for i in 0..qty {
            let label = if qty > 1 {
                format!("{name} (#{})", i + 1)
            } else {
                name.to_string()
            };
            dist.push(kind, label);
        }
    }
}

/// 统计无线电表的设备分布
pub fn count_assets(records: &[Record], sheet_name: &str) -> AssetDistribution {
    let mut dist = AssetDistribution::default();
    for r in records {
        let name = display_name(r, sheet_name);
        tally_record(&mut dist, r, &name);
    }
    dist
}
