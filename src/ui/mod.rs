use crate::app_state::{App, FocusArea, InputMode, ViewMode, MENU_ITEMS};
use assethub::ai::ChatRole;
use assethub::domain::assets::AssetKind;
use assethub::domain::due::DueStatus;
use assethub::domain::metrics::format_grouped;
use assethub::domain::table_view::TableRow;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    // 创建布局
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 顶部标题栏
            Constraint::Min(0),    // 中间内容区域
            Constraint::Length(10), // 底部命令/日志区域
        ])
        .split(f.size());

    render_top_bar(f, chunks[0], app);

    // 中间内容区域（左侧菜单 + 主视图）
    let middle_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(chunks[1]);

    render_left_menu(f, middle_chunks[0], app);
    render_main_view(f, middle_chunks[1], app);
    render_bottom_bar(f, chunks[2], app);
}

fn status_color(status: DueStatus) -> Color {
    match status {
        DueStatus::Critical => Color::Red,
        DueStatus::Warning => Color::Yellow,
        DueStatus::Normal => Color::Green,
    }
}

fn view_block<'a>(title: String, app: &App) -> Block<'a> {
    Block::default().borders(Borders::ALL).title(title).style(
        if app.focus_area == FocusArea::MainView {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        },
    )
}

fn render_top_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            " Battery Asset Hub ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
    ];

    for (i, sheet) in app.sheets.iter().enumerate() {
        let style = if i == app.active_sheet {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} {} ", i + 1, sheet.name.trim()), style));
        spans.push(Span::raw(" "));
    }

    if app.loading {
        spans.push(Span::styled(" ⟳ กำลังโหลด ", Style::default().fg(Color::Yellow)));
    } else if let Some(at) = app.loaded_at {
        let source = if app.from_cache { "缓存" } else { "在线" };
        let color = if app.from_cache { Color::Yellow } else { Color::Green };
        spans.push(Span::styled(
            format!(" {} {} ", source, at.format("%H:%M:%S")),
            Style::default().fg(color),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        )
        .alignment(ratatui::layout::Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_left_menu(f: &mut Frame, area: Rect, app: &App) {
    let menu_items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, (text, mode))| {
            let is_selected = i == app.menu_selected_index;
            let is_active = *mode == app.view_mode;

            let style = if is_selected {
                if app.focus_area == FocusArea::Menu {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                }
            } else if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            let prefix = if is_active { "● " } else { "○ " };
            ListItem::new(format!("{}{}", prefix, text)).style(style)
        })
        .collect();

    let title = if app.focus_area == FocusArea::Menu {
        "菜单 (Enter/c 确认)"
    } else {
        "菜单 (← 切换)"
    };

    let menu =
        List::new(menu_items).block(Block::default().borders(Borders::ALL).title(title).style(
            if app.focus_area == FocusArea::Menu {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            },
        ));

    f.render_widget(menu, area);
}

fn render_main_view(f: &mut Frame, area: Rect, app: &mut App) {
    if app.sheets.is_empty() {
        let msg = if app.loading {
            "กำลังโหลดข้อมูล..."
        } else {
            "ไม่มีข้อมูล (r 重新加载)"
        };
        f.render_widget(
            Paragraph::new(msg).block(view_block("数据".to_string(), app)),
            area,
        );
        return;
    }

    match app.view_mode {
        ViewMode::Dashboard => render_dashboard(f, area, app),
        ViewMode::Table => render_table(f, area, app),
        ViewMode::Detail => render_detail(f, area, app),
        ViewMode::Insight => render_insight(f, area, app),
        ViewMode::Chat => render_chat(f, area, app),
    }
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let Some(summary) = app.current_summary() else {
        return;
    };

    let rows = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(8), Constraint::Length(7)])
        .split(area);

    // 指标卡片
    let mut cards = vec![
        ("อุปกรณ์ทั้งหมด", summary.total_rows.to_string(), Color::Cyan),
        (
            "เลยกำหนด",
            summary.critical.count.to_string(),
            Color::Red,
        ),
        ("ใกล้กำหนด", summary.warning.count.to_string(), Color::Yellow),
        ("ปกติ", summary.normal.count.to_string(), Color::Green),
    ];
    if let Some(rent) = summary.rent_total {
        cards.push(("ค่าเช่า/ปี", format!("฿{}", format_grouped(rent)), Color::Magenta));
    }
    let card_areas = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, cards.len() as u32); cards.len()])
        .split(rows[0]);
    for ((title, value, color), card_area) in cards.into_iter().zip(card_areas.iter()) {
        let p = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .alignment(ratatui::layout::Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(p, *card_area);
    }

    // 月度更换预测
    let series = summary.projection.series();
    let bars: Vec<Bar> = series
        .iter()
        .map(|b| {
            Bar::default()
                .value(b.count as u64)
                .label(Line::from(b.label()))
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();
    let title = if series.is_empty() {
        "แผนการเปลี่ยนแบตเตอรี่ 12 เดือน (ไม่มีข้อมูล)".to_string()
    } else {
        "แผนการเปลี่ยนแบตเตอรี่ 12 เดือน".to_string()
    };
    let chart = BarChart::default()
        .block(view_block(title, app))
        .data(BarGroup::default().bars(&bars))
        .bar_width(7)
        .bar_gap(1)
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, rows[1]);

    let bottom = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);

    // 状态分布
    let total: usize = DueStatus::ALL.iter().map(|s| summary.bucket(*s).count).sum();
    let mut status_lines: Vec<Line> = summary
        .status_slices()
        .into_iter()
        .map(|(s, b)| {
            let pct = if total > 0 { b.count * 100 / total } else { 0 };
            Line::from(vec![
                Span::styled("■ ", Style::default().fg(status_color(s))),
                Span::raw(format!("{:<22} {:>4} ({}%)", s.label(), b.count, pct)),
            ])
        })
        .collect();
    if status_lines.is_empty() {
        status_lines.push(Line::from("ไม่มีข้อมูลวันครบกำหนด"));
    }
    if summary.unclassified > 0 {
        status_lines.push(Line::from(Span::styled(
            format!("  无法识别的日期: {}", summary.unclassified),
            Style::default().fg(Color::Gray),
        )));
    }
    f.render_widget(
        Paragraph::new(status_lines)
            .block(Block::default().borders(Borders::ALL).title("สถานะ")),
        bottom[0],
    );

    // 无线电设备分布
    let asset_lines: Vec<Line> = match &summary.assets {
        Some(assets) => AssetKind::ORDER
            .iter()
            .map(|k| {
                let count = assets.get(*k).count;
                Line::from(vec![
                    Span::styled(format!("{:<14}", k.label()), Style::default().fg(Color::Cyan)),
                    Span::raw(format!("{:>4} ", count)),
                    Span::styled("█".repeat(count.min(30)), Style::default().fg(Color::Blue)),
                ])
            })
            .collect(),
        None => vec![Line::from(Span::styled(
            "Enter/c 查看明细",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        ))],
    };
    let asset_title = match &summary.assets {
        Some(a) => format!("อุปกรณ์วิทยุ ({})", a.total()),
        None => "明细".to_string(),
    };
    f.render_widget(
        Paragraph::new(asset_lines)
            .block(Block::default().borders(Borders::ALL).title(asset_title)),
        bottom[1],
    );
}

/// 列宽取该列表头与单元格的最大字符数
fn column_width(header: &str, index: usize, rows: &[TableRow]) -> u16 {
    rows.iter()
        .filter_map(|r| r.cells.get(index))
        .map(|c| c.chars().count())
        .max()
        .unwrap_or(0)
        .max(header.chars().count())
        .clamp(4, 24) as u16
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let (headers, rows) = app.table_view();
    let total = app.current_sheet().map(|s| s.rows.len()).unwrap_or(0);

    let widths: Vec<Constraint> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| Constraint::Length(column_width(h, i, &rows)))
        .collect();

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            let style = if r.overdue {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::White)
            };
            Row::new(r.cells.clone()).style(style)
        })
        .collect();

    let query_info = if app.search_query.is_empty() {
        String::new()
    } else {
        format!(" 搜索: \"{}\"", app.search_query)
    };
    let title = format!(
        "ตารางข้อมูล {} [{}/{}]{} (s 搜索, ↑↓ 选择, ← 菜单)",
        app.current_sheet().map(|s| s.name.trim()).unwrap_or_default(),
        rows.len(),
        total,
        query_info
    );

    let table = Table::new(table_rows, widths)
        .header(
            Row::new(headers).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        )
        .block(view_block(title, app))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_detail(f: &mut Frame, area: Rect, app: &App) {
    let groups = app.drill_groups();
    let cols = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let items: Vec<ListItem> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let style = if i == app.drill_index {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(g.label.clone()).style(style)
        })
        .collect();
    f.render_widget(
        List::new(items).block(view_block("分组 (↑↓ 选择)".to_string(), app)),
        cols[0],
    );

    let lines: Vec<Line> = match groups.get(app.drill_index) {
        Some(g) if !g.names.is_empty() => g
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| Line::from(format!("{:>3}. {}", i + 1, n)))
            .collect(),
        _ => vec![Line::from("ไม่มีรายการ")],
    };
    let title = groups
        .get(app.drill_index)
        .map(|g| g.label.clone())
        .unwrap_or_default();
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .scroll((app.detail_scroll, 0)),
        cols[1],
    );
}

fn render_insight(f: &mut Frame, area: Rect, app: &App) {
    let heading = |s: &'static str| {
        Line::from(Span::styled(
            s,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
    };

    let content = if app.analyzing {
        vec![Line::from("AI กำลังวิเคราะห์ข้อมูล...")]
    } else if let Some(ref result) = app.analysis {
        let mut lines = vec![heading("--- สรุปภาพรวม ---"), Line::from(result.summary.clone())];
        lines.push(Line::from(""));
        lines.push(heading("--- ข้อสังเกต ---"));
        for item in &result.insights {
            lines.push(Line::from(format!("  • {}", item)));
        }
        lines.push(Line::from(""));
        lines.push(heading("--- ข้อเสนอแนะ ---"));
        for item in &result.recommendations {
            lines.push(Line::from(vec![
                Span::styled("  ✓ ", Style::default().fg(Color::Green)),
                Span::raw(item.clone()),
            ]));
        }
        lines
    } else {
        vec![Line::from(Span::styled(
            "按 a 或输入 `analyze` 开始分析",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        ))]
    };

    let paragraph = Paragraph::new(content)
        .block(view_block("AI 分析 (↑↓ 滚动, ← 切换菜单)".to_string(), app))
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    f.render_widget(paragraph, area);
}

fn render_chat(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();
    for msg in &app.chat_messages {
        let (who, color) = match msg.role {
            ChatRole::User => ("คุณ", Color::Cyan),
            ChatRole::Assistant => ("AI", Color::Green),
        };
        lines.push(Line::from(Span::styled(
            format!("{}:", who),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for l in msg.text.lines() {
            lines.push(Line::from(format!("  {}", l)));
        }
        lines.push(Line::from(""));
    }
    if app.chat_typing {
        lines.push(Line::from(Span::styled(
            "AI กำลังพิมพ์...",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(view_block(
            "AI 对话 (Enter 提问, `chat clear` 清空, ↑↓ 滚动)".to_string(),
            app,
        ))
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    f.render_widget(paragraph, area);
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    // 命令输入区域
    let command_prompt = if app.input_mode == InputMode::Command {
        let mut spans = vec![Span::styled(
            "命令: ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )];
        let cur = app.command_cursor.min(app.command_input.len());
        let (left, right) = app.command_input.split_at(cur);
        spans.push(Span::raw(left));
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(right));

        // 补全提示
        if let Some(hint) = app.get_completion_hint() {
            spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
        }

        vec![
            Line::from(spans),
            Line::from("Enter执行 Esc取消 Tab补全 ←→光标 Home/End ↑历史 ↓下一条"),
        ]
    } else {
        vec![
            Line::from(vec![
                Span::styled("命令: ", Style::default().fg(Color::Yellow)),
                Span::raw("(按 / 进入命令模式)"),
            ]),
            Line::from("/命令 s搜索 r刷新 a分析 Tab/1-9切换表 ←→焦点 ↑↓导航 Enter/c确认 x返回 q退出"),
        ]
    };
    let command_paragraph = Paragraph::new(command_prompt).block(
        Block::default()
            .borders(Borders::ALL)
            .title(if app.input_mode == InputMode::Command {
                "命令输入模式"
            } else {
                "命令输入"
            })
            .style(if app.input_mode == InputMode::Command {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            }),
    );
    f.render_widget(command_paragraph, bottom_chunks[0]);

    // 最新的日志在顶部
    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .rev()
        .take(20)
        .map(|msg| {
            let style = if msg.starts_with('✓') {
                Style::default().fg(Color::Green)
            } else if msg.starts_with('✗') {
                Style::default().fg(Color::Red)
            } else if msg.starts_with('⚠') {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(msg.as_str()).style(style)
        })
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("日志 (共 {} 条)", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}
