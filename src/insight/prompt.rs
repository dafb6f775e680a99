use crate::domain::record::SheetData;

/// 分析提示中每张表最多带的行数
pub const ANALYSIS_ROW_LIMIT: usize = 60;

pub const CHAT_GREETING: &str = "สวัสดีครับ ผมคือ AI ผู้เชี่ยวชาญด้านแผนเปลี่ยนแบตเตอรี่ มีอะไรให้ช่วยวิเคราะห์หรือต้องการดูตารางสรุปอุปกรณ์ไหมครับ?";

pub const ANALYSIS_SYSTEM: &str =
    "You are a maintenance and asset analyst. Reply with a single JSON object only.";

const FIELD_DEFINITIONS: &str = "Definition:
- CCTV: UPS (Bat Qty), INS_BAT (Install Date), NEXT_BAT (Due Date)
- PABX: N_BAT (Bat Qty), INS_BAT (Install Date), NEXT_BAT (Due Date)
- Digital Radio (Comprehensive):
    - Infrastructure: Tower_No1, Tower_No2 (เสาโครงเหล็ก)
    - Equipment: Base_Station, FIXED Radio, MOBILE RADIO, HANHELD
    - Revenue/Tenants: Rent_Tower (ผู้เช่า), Area_PEA (พื้นที่รับผิดชอบ), Rent_Hight_Tower (ความสูงที่เช่า), Rent_Year (ค่าเช่าต่อปี)";

fn rows_json(sheet: &SheetData, limit: Option<usize>) -> String {
    let rows = match limit {
        Some(n) => &sheet.rows[..sheet.rows.len().min(n)],
        None => &sheet.rows[..],
    };
    serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string())
}

/// 资产与维护的战略分析提示，要求返回 {summary, insights, recommendations}
pub fn analysis_prompt(sheets: &[SheetData]) -> String {
    let context = sheets
        .iter()
        .map(|s| {
            format!(
                "Sheet: \"{}\" ({} records).\n{}\n\nData Summary: {}",
                s.name,
                s.rows.len(),
                FIELD_DEFINITIONS,
                rows_json(s, Some(ANALYSIS_ROW_LIMIT))
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"คุณคือ "AI Strategic Maintenance & Asset Manager" ผู้เชี่ยวชาญด้านระบบสื่อสารและบริหารจัดการทรัพย์สิน

ข้อมูลด้านล่างคือสถานะแบตเตอรี่และข้อมูลการเช่าโครงสร้างพื้นฐาน (Digital Radio, CCTV, PABX):
{context}

ภารกิจของคุณคือวิเคราะห์ข้อมูลเชิงกลยุทธ์:
1. [ASSET ANALYSIS] สรุปจำนวนอุปกรณ์ Digital Radio แยกตามประเภท (Base, Fixed, Mobile, Handheld) และสถานะเสา (Tower)
2. [REVENUE & COST]
   - คำนวณรายได้รวมจากค่าเช่าเสา (Rent_Year) และสรุปผู้เช่ารายใหญ่
   - ประมาณการงบประมาณเปลี่ยนแบตเตอรี่ (CCTV: 800, PABX/Radio: 10,000 ต่อก้อน)
3. [OPERATIONAL INSIGHTS] วิเคราะห์ความเสี่ยงของอุปกรณ์ที่เลยกำหนด (Overdue) และเสนอแผน Grouping การลงพื้นที่ตาม Area_PEA

กรุณาส่งกลับในรูปแบบ JSON:
{{
  "summary": "สรุปภาพรวมสินทรัพย์ รายได้ค่าเช่า และความเสี่ยงด้านการซ่อมบำรุง",
  "insights": ["วิเคราะห์รายได้จาก Rent_Year", "รายการอุปกรณ์ Digital Radio ที่ต้องเฝ้าระวัง", "สรุปจำนวนแบตเตอรี่ที่ต้องสั่งซื้อ"],
  "recommendations": ["กลยุทธ์การเพิ่มรายได้จากพื้นที่ Area_PEA", "แผนการซ่อมบำรุงเชิงป้องกัน", "การบริหารจัดการสต็อกอะไหล่"]
}}"#
    )
}

/// 对话的 system instruction：附带全部数据（跳过名为 code 的表）和回答规则
pub fn chat_system_instruction(sheets: &[SheetData]) -> String {
    let context = sheets
        .iter()
        .filter(|s| !s.name.trim().eq_ignore_ascii_case("code"))
        .map(|s| format!("Sheet {} ({} records): {}", s.name, s.rows.len(), rows_json(s, None)))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"คุณคือ "Expert Maintenance Chatbot" ที่เชี่ยวชาญการจัดการแบตเตอรี่ (CCTV, PABX, Radio)
ข้อมูลที่คุณมี: {context}

กติกาการตอบคำถาม:
1. หากผู้ใช้ถามถึงอุปกรณ์, รายการ, สถานี, หรือขอสรุปข้อมูล "ต้องตอบเป็นตาราง Markdown เสมอ"
2. รูปแบบตารางที่บังคับ:
   | ลำดับ | รายชื่ออุปกรณ์/จุดติดตั้ง | สถานะ/วันที่ครบกำหนด (พ.ศ.) | หมายเหตุ |
3. วันที่ต้องแปลงเป็นรูปแบบ พ.ศ. (วว/ดด/25xx)
4. หากข้อมูลมีจำนวนมาก ให้คัดเลือกรายการที่สำคัญหรือวิกฤตมาแสดงในตารางก่อน แล้วสรุปยอดรวมตอนท้าย
5. ใช้ภาษาไทยที่สุภาพ เป็นทางการ และเข้าใจง่าย
6. หากถามเรื่องงบประมาณ ให้คำนวณตามราคา: CCTV=800, PABX/Radio=10,000 ต่อก้อน
7. พิจารณาบทสนทนาก่อนหน้า (History) เพื่อให้การตอบคำถามต่อเนื่องและแม่นยำ
8. เวลาตรวจสอบจำนวนอุปกรณ์ (เช่น Base Station, Tower) ให้ตรวจสอบทุกแถวในข้อมูลที่ได้รับอย่างละเอียด ห้ามประมาณการโดยเด็ดขาด
9. หากในข้อมูลมีจำนวนระบุไว้ในช่อง (เช่น "2" หรือ "2 ชุด") ให้นับรวมตามจำนวนนั้น
10. กฎการตรวจสอบวันเปลี่ยนแบตเตอรี่:
    - CCTV: ใช้วันที่จากคอลัมน์ 'NEXT_BAT' เท่านั้น
    - PABX: ใช้วันที่จากคอลัมน์ 'NEXT_BAT' เท่านั้น
    - Digital Radio: Base Station / Repeater ดู 'NEXTB_BAT', Fixed Radio ดู 'NEXTF_BAT', Handheld หรือ Mobile Radio ดู 'NEXTH_BAT'
    - ห้ามใช้คอลัมน์ NEXT_BAT สำหรับ Digital Radio เด็ดขาด"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Record;

    fn sheet(name: &str, n: usize) -> SheetData {
        let rows = (0..n)
            .map(|i| Record::from_pairs([("NAME", format!("row-{i}"))]))
            .collect();
        SheetData::new(name, rows)
    }

    #[test]
    fn analysis_prompt_caps_rows_per_sheet() {
        let p = analysis_prompt(&[sheet("CCTV", 75)]);
        assert!(p.contains("Sheet: \"CCTV\" (75 records)"));
        assert!(p.contains("row-59"));
        assert!(!p.contains("row-60"));
        assert!(p.contains("\"recommendations\""));
    }

    #[test]
    fn chat_instruction_skips_code_sheet_and_keeps_all_rows() {
        let p = chat_system_instruction(&[sheet("PABX", 70), sheet(" Code ", 1)]);
        assert!(p.contains("Sheet PABX (70 records)"));
        assert!(p.contains("row-69"));
        assert!(!p.contains("Sheet  Code"));
        assert!(p.contains("NEXTH_BAT"));
    }
}
