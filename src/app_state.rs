use crate::commands::AppCommand;
use assethub::ai::ChatMessage;
use assethub::domain::due::DueStatus;
use assethub::domain::summary::{summarize, SheetSummary};
use assethub::domain::table_view::{build_rows, TableRow};
use assethub::domain::{CategoryConfig, SheetData};
use assethub::insight::AnalysisResult;
use assethub::sheet::LoadOutcome;
use chrono::{DateTime, Local, NaiveDateTime};
use crossterm::event::KeyCode;
use ratatui::widgets::TableState;
use std::str::FromStr;
use tokio::sync::mpsc;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ViewMode {
    Dashboard,
    Table,
    Detail,
    Insight,
    Chat,
}

pub const MENU_ITEMS: [(&str, ViewMode); 5] = [
    ("仪表盘", ViewMode::Dashboard),
    ("数据表", ViewMode::Table),
    ("明细", ViewMode::Detail),
    ("AI 分析", ViewMode::Insight),
    ("AI 对话", ViewMode::Chat),
];

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Command,
}

#[derive(PartialEq, Debug, Clone)]
pub enum FocusArea {
    Menu,     // 焦点在左侧菜单
    MainView, // 焦点在主视图
}

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Message(String),
    Error(String),
    Loading(bool),
    Sheets(LoadOutcome),
    /// 本地增删行后的工作集
    SheetsEdited(Vec<SheetData>),
    Analysis(AnalysisResult),
    AnalysisFailed,
    Chat {
        messages: Vec<ChatMessage>,
        typing: bool,
    },
}

/// 明细视图中的一个分组（到期状态 / 设备类别 / 月份）
#[derive(Debug, Clone, PartialEq)]
pub struct DrillGroup {
    pub label: String,
    pub names: Vec<String>,
}

pub struct App {
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub focus_area: FocusArea,
    pub menu_selected_index: usize,
    pub categories: CategoryConfig,
    pub sheets: Vec<SheetData>,
    pub active_sheet: usize,
    pub search_query: String,
    pub table_selected: usize,
    pub table_state: TableState,
    pub drill_index: usize,
    pub detail_scroll: u16,
    pub loading: bool,
    pub from_cache: bool,
    pub loaded_at: Option<DateTime<Local>>,
    pub analysis: Option<AnalysisResult>,
    pub analyzing: bool,
    pub chat_messages: Vec<ChatMessage>,
    pub chat_typing: bool,
    pub chat_scroll: u16,
    pub command_input: String,
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,
    pub log_messages: Vec<String>,
    pub cmd_tx: mpsc::UnboundedSender<AppCommand>,
    pub evt_rx: Option<mpsc::UnboundedReceiver<AppEvent>>,
}

impl App {
    pub fn new(
        startup_info: Vec<String>,
        categories: CategoryConfig,
        cmd_tx: mpsc::UnboundedSender<AppCommand>,
        evt_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> App {
        let mut log_messages = vec!["应用已启动".to_string()];
        log_messages.extend(startup_info);

        App {
            view_mode: ViewMode::Dashboard,
            input_mode: InputMode::Normal,
            focus_area: FocusArea::Menu,
            menu_selected_index: 0,
            categories,
            sheets: Vec::new(),
            active_sheet: 0,
            search_query: String::new(),
            table_selected: 0,
            table_state: TableState::default(),
            drill_index: 0,
            detail_scroll: 0,
            loading: false,
            from_cache: false,
            loaded_at: None,
            analysis: None,
            analyzing: false,
            chat_messages: Vec::new(),
            chat_typing: false,
            chat_scroll: 0,
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            log_messages,
            cmd_tx,
            evt_rx: Some(evt_rx),
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(msg) | AppEvent::Message(msg) | AppEvent::Error(msg) => {
                self.add_log(msg)
            }
            AppEvent::Loading(flag) => self.loading = flag,
            AppEvent::Sheets(outcome) => {
                self.from_cache = outcome.from_cache;
                self.loaded_at = Some(outcome.loaded_at);
                self.set_sheets(outcome.sheets);
            }
            AppEvent::SheetsEdited(sheets) => self.set_sheets(sheets),
            AppEvent::Analysis(result) => {
                self.analysis = Some(result);
                self.analyzing = false;
                self.add_log("✓ AI 分析完成".to_string());
            }
            AppEvent::AnalysisFailed => self.analyzing = false,
            AppEvent::Chat { messages, typing } => {
                self.chat_messages = messages;
                self.chat_typing = typing;
            }
        }
    }

    /// 替换工作集；统计在读取时按当前时间重新计算
    pub fn set_sheets(&mut self, sheets: Vec<SheetData>) {
        self.sheets = sheets;
        if self.active_sheet >= self.sheets.len() {
            self.active_sheet = 0;
        }
        self.clamp_selection();
    }

    pub fn current_sheet(&self) -> Option<&SheetData> {
        self.sheets.get(self.active_sheet)
    }

    pub fn current_summary(&self) -> Option<SheetSummary> {
        self.summary_at(Local::now().naive_local())
    }

    /// 到期分桶不缓存，每次渲染都以给定时刻重新分类
    pub fn summary_at(&self, now: NaiveDateTime) -> Option<SheetSummary> {
        self.current_sheet()
            .map(|sheet| summarize(sheet, &self.categories, now))
    }

    pub fn table_view(&self) -> (Vec<String>, Vec<TableRow>) {
        match self.current_sheet() {
            Some(sheet) => build_rows(
                sheet,
                &self.search_query,
                &self.categories,
                Local::now().naive_local(),
            ),
            None => (Vec::new(), Vec::new()),
        }
    }

    pub fn drill_groups(&self) -> Vec<DrillGroup> {
        self.drill_groups_at(Local::now().naive_local())
    }

    pub fn drill_groups_at(&self, now: NaiveDateTime) -> Vec<DrillGroup> {
        let Some(summary) = self.summary_at(now) else {
            return Vec::new();
        };
        let mut groups: Vec<DrillGroup> = DueStatus::ALL
            .iter()
            .map(|s| {
                let bucket = summary.bucket(*s);
                DrillGroup {
                    label: format!("{} ({})", s.label(), bucket.count),
                    names: bucket.names.clone(),
                }
            })
            .collect();
        if let Some(assets) = &summary.assets {
            groups.extend(assets.bars().into_iter().map(|b| DrillGroup {
                label: format!("{} ({})", b.kind.label(), b.count),
                names: b.names,
            }));
        }
        groups.extend(summary.projection.series().into_iter().map(|p| DrillGroup {
            label: format!("ครบกำหนด {} ({})", p.label(), p.count),
            names: p.names,
        }));
        groups
    }

    pub fn select_sheet(&mut self, idx: usize) {
        if idx < self.sheets.len() && idx != self.active_sheet {
            self.active_sheet = idx;
            self.search_query.clear();
            self.table_selected = 0;
            self.drill_index = 0;
            self.detail_scroll = 0;
            self.clamp_selection();
        }
    }

    /// 按序号（从 1 开始）或名称选择表
    pub fn select_sheet_by_arg(&mut self, arg: &str) -> bool {
        let arg = arg.trim();
        let idx = arg
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .or_else(|| {
                self.sheets
                    .iter()
                    .position(|s| s.name.trim().eq_ignore_ascii_case(arg))
            });
        match idx {
            Some(i) if i < self.sheets.len() => {
                self.select_sheet(i);
                true
            }
            _ => false,
        }
    }

    fn cycle_sheet(&mut self, forward: bool) {
        let n = self.sheets.len();
        if n == 0 {
            return;
        }
        let next = if forward {
            (self.active_sheet + 1) % n
        } else {
            (self.active_sheet + n - 1) % n
        };
        self.select_sheet(next);
    }

    pub fn clamp_selection(&mut self) {
        let rows = self.table_view().1.len();
        if self.table_selected >= rows {
            self.table_selected = rows.saturating_sub(1);
        }
        self.table_state.select(if rows == 0 {
            None
        } else {
            Some(self.table_selected)
        });
        let groups = self.drill_groups().len();
        if self.drill_index >= groups {
            self.drill_index = groups.saturating_sub(1);
        }
    }

    fn set_view(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        if let Some(i) = MENU_ITEMS.iter().position(|(_, m)| *m == mode) {
            self.menu_selected_index = i;
        }
    }

    /// 获取当前的预测建议
    pub fn get_completion_hint(&self) -> Option<String> {
        let commands = [
            "refresh", "analyze", "ask", "chat", "add", "delete", "search", "sheet", "help",
            "quit",
        ];
        let input = self.command_input.trim();
        if input.is_empty() {
            return None;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.len() == 1 {
            if parts[0] == "sheet" {
                return self
                    .sheets
                    .first()
                    .map(|s| format!(" {}", s.name.trim()));
            }
            for cmd in commands {
                if cmd.starts_with(parts[0]) && cmd != parts[0] {
                    return Some(cmd[parts[0].len()..].to_string());
                }
            }
            return None;
        }
        if parts[0] == "sheet" {
            let cur = parts[1..].join(" ").to_uppercase();
            for s in &self.sheets {
                let name = s.name.trim().to_uppercase();
                if name.starts_with(&cur) && name != cur {
                    return Some(name[cur.len()..].to_string());
                }
            }
        }
        None
    }

    /// 执行一条命令；返回 true 表示退出
    pub fn submit_command(&mut self, cmd: &str) -> bool {
        let cmd = cmd.trim();
        if cmd.is_empty() {
            return false;
        }
        self.command_history.push(cmd.to_string());
        self.command_history_index = None;

        // 搜索、切换表只影响界面状态
        let (word, rest) = cmd.split_once(char::is_whitespace).unwrap_or((cmd, ""));
        if word == "search" {
            let q = rest.trim();
            self.search_query = if q == "clear" { String::new() } else { q.to_string() };
            self.table_selected = 0;
            self.set_view(ViewMode::Table);
            self.clamp_selection();
            return false;
        }
        if word == "sheet" {
            if !self.select_sheet_by_arg(rest) {
                self.add_log(format!("✗ 未找到表: {}", rest.trim()));
            }
            return false;
        }

        let parsed = AppCommand::from_str(cmd).unwrap_or_else(|_| AppCommand::Unknown(cmd.to_string()));
        let current = self
            .current_sheet()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let parsed = parsed.for_sheet(&current);
        match &parsed {
            AppCommand::Analyze => {
                self.analyzing = true;
                self.set_view(ViewMode::Insight);
            }
            AppCommand::Ask { .. } | AppCommand::ChatClear => self.set_view(ViewMode::Chat),
            _ => {}
        }
        let quit = parsed == AppCommand::Quit;
        let _ = self.cmd_tx.send(parsed);
        quit
    }

    fn enter_command_mode(&mut self, prefill: &str) {
        self.input_mode = InputMode::Command;
        self.command_input = prefill.to_string();
        self.command_cursor = self.command_input.len();
    }

    fn leave_command_mode(&mut self) {
        self.command_input.clear();
        self.command_cursor = 0;
        self.input_mode = InputMode::Normal;
    }

    fn prev_char_boundary(&self) -> usize {
        self.command_input[..self.command_cursor]
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_char_boundary(&self) -> usize {
        self.command_input[self.command_cursor..]
            .chars()
            .next()
            .map(|c| self.command_cursor + c.len_utf8())
            .unwrap_or(self.command_cursor)
    }

    fn scroll_up(&mut self) {
        match self.view_mode {
            ViewMode::Table => {
                self.table_selected = self.table_selected.saturating_sub(1);
                self.clamp_selection();
            }
            ViewMode::Detail => {
                if self.drill_index > 0 {
                    self.drill_index -= 1;
                    self.detail_scroll = 0;
                }
            }
            ViewMode::Insight | ViewMode::Dashboard => {
                self.detail_scroll = self.detail_scroll.saturating_sub(1)
            }
            ViewMode::Chat => self.chat_scroll = self.chat_scroll.saturating_sub(1),
        }
    }

    fn scroll_down(&mut self) {
        match self.view_mode {
            ViewMode::Table => {
                self.table_selected += 1;
                self.clamp_selection();
            }
            ViewMode::Detail => {
                if self.drill_index + 1 < self.drill_groups().len() {
                    self.drill_index += 1;
                    self.detail_scroll = 0;
                }
            }
            ViewMode::Insight | ViewMode::Dashboard => {
                self.detail_scroll = self.detail_scroll.saturating_add(1)
            }
            ViewMode::Chat => self.chat_scroll = self.chat_scroll.saturating_add(1),
        }
    }

    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        if self.input_mode == InputMode::Command {
            match key {
                KeyCode::Enter => {
                    let cmd_owned = self.command_input.trim().to_string();
                    self.leave_command_mode();
                    return self.submit_command(&cmd_owned);
                }
                KeyCode::Esc => self.leave_command_mode(),
                KeyCode::Tab => {
                    if let Some(hint) = self.get_completion_hint() {
                        self.command_input.insert_str(self.command_cursor, &hint);
                        self.command_cursor += hint.len();
                    }
                }
                KeyCode::Up => {
                    if self.command_history.is_empty() {
                        return false;
                    }
                    let next = match self.command_history_index {
                        None => self.command_history.len().saturating_sub(1),
                        Some(i) => i.saturating_sub(1),
                    };
                    self.command_history_index = Some(next);
                    if let Some(cmd) = self.command_history.get(next) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.command_input.len();
                    }
                }
                KeyCode::Down => {
                    let Some(i) = self.command_history_index else {
                        return false;
                    };
                    let n = i + 1;
                    if n >= self.command_history.len() {
                        self.command_history_index = None;
                        self.command_input.clear();
                        self.command_cursor = 0;
                        return false;
                    }
                    self.command_history_index = Some(n);
                    if let Some(cmd) = self.command_history.get(n) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.command_input.len();
                    }
                }
                KeyCode::Backspace => {
                    if self.command_cursor > 0 {
                        let idx = self.prev_char_boundary();
                        self.command_input.remove(idx);
                        self.command_cursor = idx;
                    }
                }
                KeyCode::Delete => {
                    if self.command_cursor < self.command_input.len() {
                        self.command_input.remove(self.command_cursor);
                    }
                }
                KeyCode::Left => self.command_cursor = self.prev_char_boundary(),
                KeyCode::Right => self.command_cursor = self.next_char_boundary(),
                KeyCode::Home => self.command_cursor = 0,
                KeyCode::End => self.command_cursor = self.command_input.len(),
                KeyCode::Char(c) => {
                    self.command_input.insert(self.command_cursor, c);
                    self.command_cursor += c.len_utf8();
                }
                _ => {}
            }
            return false;
        }

        // 正常模式下的按键处理
        match key {
            KeyCode::Char('/') => self.enter_command_mode(""),
            KeyCode::Char('s') => self.enter_command_mode("search "),
            KeyCode::Char('q') => return true,
            KeyCode::Char('r') => {
                let _ = self.cmd_tx.send(AppCommand::Refresh);
            }
            KeyCode::Char('a') => {
                self.submit_command("analyze");
            }
            KeyCode::Tab | KeyCode::Char(']') => self.cycle_sheet(true),
            KeyCode::BackTab | KeyCode::Char('[') => self.cycle_sheet(false),
            KeyCode::Char(c @ '1'..='9') => {
                self.select_sheet(c as usize - '1' as usize);
            }
            KeyCode::Left => self.focus_area = FocusArea::Menu,
            KeyCode::Right => self.focus_area = FocusArea::MainView,
            KeyCode::Up => {
                if self.focus_area == FocusArea::Menu {
                    self.menu_selected_index = self.menu_selected_index.saturating_sub(1);
                } else {
                    self.scroll_up();
                }
            }
            KeyCode::Down => {
                if self.focus_area == FocusArea::Menu {
                    if self.menu_selected_index < MENU_ITEMS.len() - 1 {
                        self.menu_selected_index += 1;
                    }
                } else {
                    self.scroll_down();
                }
            }
            KeyCode::Enter | KeyCode::Char('c') => {
                if self.focus_area == FocusArea::Menu {
                    self.view_mode = MENU_ITEMS[self.menu_selected_index].1;
                    self.detail_scroll = 0;
                    // 确认后自动切换焦点到主视图
                    self.focus_area = FocusArea::MainView;
                } else if self.view_mode == ViewMode::Chat {
                    self.enter_command_mode("ask ");
                } else if self.view_mode == ViewMode::Dashboard {
                    self.set_view(ViewMode::Detail);
                }
            }
            KeyCode::Char('x') | KeyCode::Esc => {
                if self.focus_area == FocusArea::MainView && self.view_mode != ViewMode::Dashboard
                {
                    self.set_view(ViewMode::Dashboard);
                }
            }
            _ => {}
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assethub::domain::Record;

    fn app() -> (App, mpsc::UnboundedReceiver<AppCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (_evt_tx, evt_rx) = mpsc::unbounded_channel();
        (
            App::new(Vec::new(), CategoryConfig::default(), cmd_tx, evt_rx),
            cmd_rx,
        )
    }

    fn sheets() -> Vec<SheetData> {
        vec![
            SheetData::new(
                "CCTV",
                vec![
                    Record::from_pairs([("NAME", "Gate"), ("NEXT_BAT", "2000-01-01")]),
                    Record::from_pairs([("NAME", "Lobby"), ("NEXT_BAT", "2999-01-01")]),
                ],
            ),
            SheetData::new("PABX", vec![Record::from_pairs([("NAME", "Exchange")])]),
        ]
    }

    #[test]
    fn loading_sheets_recomputes_summaries() {
        let (mut app, _rx) = app();
        app.apply_event(AppEvent::SheetsEdited(sheets()));
        assert_eq!(app.current_summary().unwrap().critical.count, 1);
        let groups = app.drill_groups();
        assert_eq!(groups[0].names, vec!["Gate"]);
    }

    #[test]
    fn due_buckets_follow_the_clock_without_reload() {
        let (mut app, _rx) = app();
        app.set_sheets(vec![SheetData::new(
            "CCTV",
            vec![Record::from_pairs([("NAME", "Gate"), ("NEXT_BAT", "2025-03-10")])],
        )]);
        let before = chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let after = before + chrono::Duration::days(10);

        let s = app.summary_at(before).unwrap();
        assert_eq!((s.warning.count, s.critical.count), (1, 0));
        let s = app.summary_at(after).unwrap();
        assert_eq!((s.warning.count, s.critical.count), (0, 1));
        assert_eq!(app.drill_groups_at(after)[0].names, vec!["Gate"]);
        assert!(app.drill_groups_at(before)[0].names.is_empty());
    }

    #[test]
    fn overdue_row_agrees_between_table_and_dashboard() {
        let (mut app, _rx) = app();
        let due = (Local::now().naive_local() - chrono::Duration::seconds(1))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        app.set_sheets(vec![SheetData::new(
            "CCTV",
            vec![Record::from_pairs([("NAME", "Gate"), ("NEXT_BAT", due.as_str())])],
        )]);
        assert!(app.table_view().1[0].overdue);
        assert_eq!(app.current_summary().unwrap().critical.count, 1);
    }

    #[test]
    fn command_words_must_match_exactly() {
        let (mut app, mut rx) = app();
        app.set_sheets(sheets());
        app.submit_command("searchx lobby");
        assert!(app.search_query.is_empty());
        assert!(matches!(rx.try_recv().unwrap(), AppCommand::Unknown(_)));
        app.submit_command("sheets 2");
        assert_eq!(app.active_sheet, 0);
        app.submit_command("search");
        assert!(app.search_query.is_empty());
        assert_eq!(app.view_mode, ViewMode::Table);
    }

    #[test]
    fn search_and_sheet_commands_stay_local() {
        let (mut app, mut rx) = app();
        app.set_sheets(sheets());
        assert!(!app.submit_command("search lobby"));
        assert_eq!(app.view_mode, ViewMode::Table);
        assert_eq!(app.table_view().1.len(), 1);
        app.submit_command("sheet pabx");
        assert_eq!(app.active_sheet, 1);
        assert!(app.search_query.is_empty());
        app.submit_command("sheet 9");
        assert_eq!(app.active_sheet, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn row_commands_target_active_sheet() {
        let (mut app, mut rx) = app();
        app.set_sheets(sheets());
        app.select_sheet(1);
        app.submit_command("delete 1");
        assert_eq!(
            rx.try_recv().unwrap(),
            AppCommand::DeleteRow {
                sheet: "PABX".into(),
                index: 1
            }
        );
        assert!(app.submit_command("quit"));
    }

    #[test]
    fn tab_cycles_sheets_and_keys_edit_command_line() {
        let (mut app, _rx) = app();
        app.set_sheets(sheets());
        app.handle_key_event(KeyCode::Tab);
        assert_eq!(app.active_sheet, 1);
        app.handle_key_event(KeyCode::Tab);
        assert_eq!(app.active_sheet, 0);

        app.handle_key_event(KeyCode::Char('/'));
        for c in "สถานี".chars() {
            app.handle_key_event(KeyCode::Char(c));
        }
        app.handle_key_event(KeyCode::Backspace);
        assert_eq!(app.command_input, "สถาน");
        app.handle_key_event(KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
    }
}
