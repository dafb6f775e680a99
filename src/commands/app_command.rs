use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Refresh,
    Analyze,
    Ask {
        question: String,
    },
    ChatClear,
    /// 空 sheet 由界面补上当前表名
    AddRow {
        sheet: String,
        assignments: Vec<String>,
    },
    /// index 为表中的行号（从 1 开始）
    DeleteRow {
        sheet: String,
        index: usize,
    },
    Help,
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "可用命令: refresh | analyze | ask <问题> | chat clear | add KEY=VALUE ... | delete <行号> | search [关键字] | sheet <名称|序号> | help | quit";

impl AppCommand {
    /// 行编辑命令绑定到当前表
    pub fn for_sheet(self, current: &str) -> Self {
        match self {
            AppCommand::AddRow { sheet, assignments } if sheet.is_empty() => AppCommand::AddRow {
                sheet: current.to_string(),
                assignments,
            },
            AppCommand::DeleteRow { sheet, index } if sheet.is_empty() => AppCommand::DeleteRow {
                sheet: current.to_string(),
                index,
            },
            other => other,
        }
    }
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "refresh" | "reload" | "r" => Ok(AppCommand::Refresh),
            "analyze" | "ai" => Ok(AppCommand::Analyze),
            "ask" => {
                let question = parts[1..].join(" ");
                if question.is_empty() {
                    Ok(AppCommand::Unknown("用法: ask <问题>".to_string()))
                } else {
                    Ok(AppCommand::Ask { question })
                }
            }
            "chat" => match parts.get(1).copied() {
                Some("clear") => Ok(AppCommand::ChatClear),
                Some(_) => Ok(AppCommand::Ask {
                    question: parts[1..].join(" "),
                }),
                None => Ok(AppCommand::Unknown("用法: chat <问题> | chat clear".to_string())),
            },
            "add" => {
                let assignments = split_assignments(s.trim_start()[parts[0].len()..].trim());
                if assignments.is_empty() {
                    Ok(AppCommand::Unknown("用法: add NAME=... KEY=VALUE ...".to_string()))
                } else {
                    Ok(AppCommand::AddRow {
                        sheet: String::new(),
                        assignments,
                    })
                }
            }
            "delete" | "del" => match parts.get(1).and_then(|n| n.parse::<usize>().ok()) {
                Some(index) if index > 0 => Ok(AppCommand::DeleteRow {
                    sheet: String::new(),
                    index,
                }),
                _ => Ok(AppCommand::Unknown("用法: delete <行号>".to_string())),
            },
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", parts[0]))),
        }
    }
}

/// `KEY=VALUE` 列表；值可用双引号包含空格
fn split_assignments(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    for c in raw.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> AppCommand {
        AppCommand::from_str(s).unwrap()
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("refresh"), AppCommand::Refresh);
        assert_eq!(parse("ai"), AppCommand::Analyze);
        assert_eq!(parse("chat clear"), AppCommand::ChatClear);
        assert_eq!(parse("q"), AppCommand::Quit);
        assert!(matches!(parse("bogus"), AppCommand::Unknown(_)));
    }

    #[test]
    fn ask_keeps_full_question() {
        assert_eq!(
            parse("ask งบประมาณ  ปีนี้ เท่าไร"),
            AppCommand::Ask {
                question: "งบประมาณ ปีนี้ เท่าไร".into()
            }
        );
        assert!(matches!(parse("ask"), AppCommand::Unknown(_)));
    }

    #[test]
    fn add_supports_quoted_values() {
        let cmd = parse(r#"add NAME="Hill Top" NEXT_BAT=2026-01-01"#).for_sheet("CCTV");
        assert_eq!(
            cmd,
            AppCommand::AddRow {
                sheet: "CCTV".into(),
                assignments: vec!["NAME=Hill Top".into(), "NEXT_BAT=2026-01-01".into()],
            }
        );
    }

    #[test]
    fn delete_needs_positive_index() {
        assert_eq!(
            parse("del 3").for_sheet("PABX"),
            AppCommand::DeleteRow {
                sheet: "PABX".into(),
                index: 3
            }
        );
        assert!(matches!(parse("delete 0"), AppCommand::Unknown(_)));
        assert!(matches!(parse("delete x"), AppCommand::Unknown(_)));
    }
}
