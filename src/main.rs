mod app_service;
mod app_state;
mod commands;
mod ui;

use assethub::ai::AnyProvider;
use assethub::config::WorkbookLocation;
use assethub::insight::InsightService;
use assethub::sheet::{SheetLoader, SheetSync};
use assethub::storage::establish_connection;
use assethub::storage::repository::SqliteSnapshotStore;
use assethub::{AppConfig, CategoryConfig};
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::app_service::AppService;
use crate::app_state::{App, AppEvent};
use crate::commands::AppCommand;
use crate::ui::draw;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = std::path::PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(log_path)?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file))) // 重定向输出到文件
        .filter_level(log::LevelFilter::Warn)
        .filter_module("assethub", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error)
        .init();

    let mut startup_info = Vec::new();
    match dotenv::dotenv() {
        Ok(path) => startup_info.push(format!("✓ 已加载 {}", path.display())),
        Err(_) => startup_info.push("⚠ 未找到 .env 文件，使用系统环境变量".to_string()),
    }

    let config = AppConfig::from_env();
    match &config.workbook {
        Some(WorkbookLocation::Remote(url)) => {
            startup_info.push(format!("✓ 数据源: {}", url))
        }
        Some(WorkbookLocation::Local(path)) => {
            startup_info.push(format!("✓ 数据源: {}", path.display()))
        }
        None => startup_info.push(
            "⚠ 未配置 SHEET_FILE / SHEET_XLSX_URL / SHEET_ID，仅使用本地快照".to_string(),
        ),
    }

    // 初始化数据库
    let db = Arc::new(
        establish_connection(&config.database_url)
            .await
            .map_err(|e| anyhow::anyhow!("数据库连接失败: {}", e))?,
    );
    startup_info.push("✓ 数据库连接成功".to_string());

    let categories = CategoryConfig::default();
    let loader = SheetLoader::new(
        config.build_source()?,
        Arc::new(SqliteSnapshotStore::new(db.clone())),
        categories.clone(),
    );

    let sync = SheetSync::new(config.sync_url.clone())?;
    if sync.is_configured() {
        startup_info.push("✓ 已配置远程同步".to_string());
    }

    let insight = match AnyProvider::from_env() {
        Ok(provider) => {
            let model = config
                .llm_model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string());
            info!("llm provider {} model {}", provider.name(), model);
            startup_info.push(format!("✓ AI 供应商: {} ({})", provider.name(), model));
            Some(InsightService::new(provider, model))
        }
        Err(e) => {
            warn!("llm provider unavailable: {}", e);
            startup_info.push(format!("⚠ AI 不可用: {}", e));
            None
        }
    };

    // 创建核心 Channel
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();

    // 后台 Actor
    let service = AppService::new(loader, sync, insight, evt_tx);
    tokio::spawn(service.run(cmd_rx));

    // 定时刷新
    if let Some(interval) = config.refresh_interval {
        let tx = cmd_tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(AppCommand::Refresh).is_err() {
                    break;
                }
            }
        });
    }

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(startup_info, categories, cmd_tx.clone(), evt_rx);

    let res = match app.evt_rx.take() {
        Some(rx) => run_app_loop(&mut terminal, &mut app, rx).await,
        None => Ok(()),
    };
    let _ = cmd_tx.send(AppCommand::Quit);

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        while let Ok(event) = evt_rx.try_recv() {
            app.apply_event(event);
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key_event(key.code) {
                    return Ok(());
                }
            }
        }
    }
}
