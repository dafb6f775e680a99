use crate::domain::record::{normalize_key, Record};

/// 空串与 "-" 视为缺失
pub fn is_present(value: &str) -> bool {
    let t = value.trim();
    !t.is_empty() && t != "-"
}

/// Returns the first candidate column holding a present value.
///
/// Candidates are tried in order; each is matched against the record's keys
/// ignoring case and surrounding whitespace. When several keys normalize to
/// the same name, any of them holding a value satisfies the candidate.
pub fn resolve_field<S: AsRef<str>>(record: &Record, candidates: &[S]) -> Option<String> {
    for cand in candidates {
        let wanted = normalize_key(cand.as_ref());
        let hit = record
            .iter()
            .filter(|(k, _)| normalize_key(k) == wanted)
            .map(|(_, v)| v.text())
            .find(|v| is_present(v));
        if let Some(v) = hit {
            return Some(v.trim().to_string());
        }
    }
    None
}

/// 单列查找，不跳过缺失值（用于需要区分 "0" / "-" 的场景）
pub fn raw_field(record: &Record, key: &str) -> Option<String> {
    record.find(key).map(|(_, v)| v.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::CellValue;

    #[test]
    fn key_spelling_variants_are_equivalent() {
        for key in ["next_bat ", "NEXT_BAT", "Next_Bat", "  NeXt_BaT"] {
            let r = Record::from_pairs([(key, "2025-03-01")]);
            assert_eq!(
                resolve_field(&r, &["NEXT_BAT"]).as_deref(),
                Some("2025-03-01"),
                "key {key:?}"
            );
        }
    }

    #[test]
    fn skips_empty_and_dash_in_priority_order() {
        let r = Record::from_pairs([
            ("NEXT_BAT", CellValue::from("")),
            ("NEXTB_BAT", CellValue::from("-")),
            ("NEXTF_BAT", CellValue::from("  ")),
            ("NEXTH_BAT", CellValue::from("2026-01-01")),
            ("NEXT_BAT_CCTV", CellValue::from("2020-01-01")),
        ]);
        let got = resolve_field(&r, &["NEXT_BAT", "NEXTB_BAT", "NEXTF_BAT", "NEXTH_BAT", "NEXT_BAT_CCTV"]);
        assert_eq!(got.as_deref(), Some("2026-01-01"));
    }

    #[test]
    fn first_candidate_wins_over_column_order() {
        let r = Record::from_pairs([("NEXTF_BAT", "2024-02-02"), ("NEXTB_BAT", "2024-01-01")]);
        assert_eq!(
            resolve_field(&r, &["NEXTB_BAT", "NEXTF_BAT"]).as_deref(),
            Some("2024-01-01")
        );
    }

    #[test]
    fn absent_when_no_candidate_matches() {
        let r = Record::from_pairs([("NAME", "x")]);
        assert_eq!(resolve_field(&r, &["NEXT_BAT"]), None);
        assert_eq!(resolve_field::<&str>(&r, &[]), None);
    }

    #[test]
    fn numbers_resolve_as_text() {
        let r = Record::from_pairs([("QTY", CellValue::Number(4.0))]);
        assert_eq!(resolve_field(&r, &["qty"]).as_deref(), Some("4"));
    }

    #[test]
    fn does_not_mutate_record() {
        let r = Record::from_pairs([("NEXT_BAT", "2025-01-01")]);
        let before = r.clone();
        let _ = resolve_field(&r, &["NEXT_BAT"]);
        assert_eq!(r, before);
    }
}
