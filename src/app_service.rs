use crate::app_state::AppEvent;
use crate::commands::app_command::{AppCommand, HELP_TEXT};
use assethub::ai::{AnyProvider, LlmProvider};
use assethub::domain::editor::{apply_assignments, new_row_template, validate_row};
use assethub::domain::record::SheetData;
use assethub::insight::{ChatSession, InsightService};
use assethub::sheet::{SheetLoader, SheetSync, SyncAction};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// 后台 Actor：持有工作集，串行处理界面发来的命令
pub struct AppService<P: LlmProvider = AnyProvider> {
    loader: SheetLoader,
    sync: SheetSync,
    insight: Option<Arc<InsightService<P>>>,
    chat: Arc<Mutex<ChatSession>>,
    sheets: Vec<SheetData>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
}

impl<P: LlmProvider + 'static> AppService<P> {
    pub fn new(
        loader: SheetLoader,
        sync: SheetSync,
        insight: Option<InsightService<P>>,
        evt_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            loader,
            sync,
            insight: insight.map(Arc::new),
            chat: Arc::new(Mutex::new(ChatSession::default())),
            sheets: Vec::new(),
            evt_tx,
        }
    }

    fn send(&self, evt: AppEvent) {
        let _ = self.evt_tx.send(evt);
    }

    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<AppCommand>) {
        self.refresh().await;
        self.publish_chat().await;

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                AppCommand::Refresh => self.refresh().await,
                AppCommand::Analyze => self.analyze(),
                AppCommand::Ask { question } => self.ask(question),
                AppCommand::ChatClear => self.clear_chat().await,
                AppCommand::AddRow { sheet, assignments } => {
                    self.add_row(&sheet, &assignments).await
                }
                AppCommand::DeleteRow { sheet, index } => self.delete_row(&sheet, index).await,
                AppCommand::Help => self.send(AppEvent::Message(HELP_TEXT.to_string())),
                AppCommand::Quit => {
                    info!("actor stopped");
                    break;
                }
                AppCommand::Unknown(msg) => self.send(AppEvent::Error(format!("✗ {}", msg))),
            }
        }
    }

    pub async fn refresh(&mut self) {
        self.send(AppEvent::Loading(true));
        match self.loader.load().await {
            Ok(outcome) => {
                if let Some(err) = &outcome.fetch_error {
                    self.send(AppEvent::Error(format!(
                        "⚠ โหลดข้อมูลล่าสุดไม่สำเร็จ ใช้ข้อมูลสำรอง ({})",
                        err
                    )));
                } else {
                    self.send(AppEvent::Message(format!(
                        "✓ 已加载 {} 张表",
                        outcome.sheets.len()
                    )));
                }
                self.sheets = outcome.sheets.clone();
                self.send(AppEvent::Sheets(outcome));
            }
            Err(e) => {
                error!("load failed: {}", e);
                self.send(AppEvent::Error(format!("✗ เกิดข้อผิดพลาดในการโหลดข้อมูล: {}", e)));
            }
        }
        self.send(AppEvent::Loading(false));
    }

    fn analyze(&self) {
        let Some(service) = self.insight.clone() else {
            self.send(AppEvent::Error("✗ 无法分析：缺少 AI 供应商配置".to_string()));
            self.send(AppEvent::AnalysisFailed);
            return;
        };
        if self.sheets.is_empty() {
            self.send(AppEvent::Error("✗ 无数据可分析".to_string()));
            self.send(AppEvent::AnalysisFailed);
            return;
        }
        let sheets = self.sheets.clone();
        let tx = self.evt_tx.clone();
        let _ = tx.send(AppEvent::Message("AI 分析中...".to_string()));
        tokio::spawn(async move {
            match service.analyze(&sheets).await {
                Ok(result) => {
                    let _ = tx.send(AppEvent::Analysis(result));
                }
                Err(e) => {
                    let _ = tx.send(AppEvent::Error(format!("✗ AI 分析失败: {}", e)));
                    let _ = tx.send(AppEvent::AnalysisFailed);
                }
            }
        });
    }

    fn ask(&self, question: String) {
        let Some(service) = self.insight.clone() else {
            self.send(AppEvent::Error("✗ 无法对话：缺少 AI 供应商配置".to_string()));
            return;
        };
        let sheets = self.sheets.clone();
        let chat = self.chat.clone();
        let tx = self.evt_tx.clone();
        tokio::spawn(async move {
            // 只在记录问答时持锁，等待模型期间不阻塞 Actor
            let pending = {
                let mut session = chat.lock().await;
                let Some(pending) = session.begin(&question) else {
                    warn!("chat skipped: empty question");
                    return;
                };
                let _ = tx.send(AppEvent::Chat {
                    messages: session.messages().to_vec(),
                    typing: true,
                });
                pending
            };

            let answer = ChatSession::reply(service.as_ref(), &sheets, &pending).await;

            let mut session = chat.lock().await;
            if !session.finish(&pending, answer) {
                info!("chat cleared while waiting, answer dropped");
            }
            let _ = tx.send(AppEvent::Chat {
                messages: session.messages().to_vec(),
                typing: false,
            });
        });
    }

    async fn clear_chat(&self) {
        self.chat.lock().await.clear();
        self.publish_chat().await;
    }

    async fn publish_chat(&self) {
        let messages = self.chat.lock().await.messages().to_vec();
        self.send(AppEvent::Chat {
            messages,
            typing: false,
        });
    }

    async fn add_row(&mut self, sheet_name: &str, assignments: &[String]) {
        let Some(pos) = self.sheets.iter().position(|s| s.name == sheet_name) else {
            self.send(AppEvent::Error(format!("✗ 未找到表: {}", sheet_name)));
            return;
        };
        let mut row = new_row_template(&self.sheets[pos]);
        if let Err(e) = apply_assignments(&mut row, assignments).and_then(|_| validate_row(&row)) {
            self.send(AppEvent::Error(format!("✗ {}", e)));
            return;
        }

        self.push_sync(SyncAction::Insert, sheet_name, &row).await;
        self.sheets[pos].rows.push(row);
        self.publish_sheets();
    }

    async fn delete_row(&mut self, sheet_name: &str, index: usize) {
        let Some(pos) = self.sheets.iter().position(|s| s.name == sheet_name) else {
            self.send(AppEvent::Error(format!("✗ 未找到表: {}", sheet_name)));
            return;
        };
        if index == 0 || index > self.sheets[pos].rows.len() {
            self.send(AppEvent::Error(format!("✗ 行号超出范围: {}", index)));
            return;
        }
        let row = self.sheets[pos].rows.remove(index - 1);
        self.push_sync(SyncAction::Delete, sheet_name, &row).await;
        self.publish_sheets();
    }

    async fn push_sync(&self, action: SyncAction, sheet_name: &str, row: &assethub::Record) {
        match self.sync.push(action, sheet_name, row).await {
            Ok(true) => self.send(AppEvent::Message(format!(
                "✓ 已同步 {} 到 {}",
                action.as_str(),
                sheet_name
            ))),
            Ok(false) => self.send(AppEvent::Message(
                "⚠ 未配置 SHEET_SYNC_URL，修改仅保存在本次会话".to_string(),
            )),
            Err(e) => {
                warn!("sync failed: {}", e);
                self.send(AppEvent::Error(format!("✗ 同步失败: {}", e)));
            }
        }
    }

    fn publish_sheets(&self) {
        self.send(AppEvent::SheetsEdited(self.sheets.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assethub::domain::{CategoryConfig, Record};
    use assethub::ai::{ChatRequest, ChatResponse, LlmError};
    use assethub::sheet::{LoadError, SnapshotStore};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    struct Seeded(Vec<SheetData>);

    #[async_trait]
    impl SnapshotStore for Seeded {
        async fn save(&self, _sheets: &[SheetData]) -> Result<(), LoadError> {
            Ok(())
        }

        async fn restore(&self) -> Result<Option<Vec<SheetData>>, LoadError> {
            Ok(Some(self.0.clone()))
        }
    }

    fn service() -> (AppService, mpsc::UnboundedReceiver<AppEvent>) {
        service_with(None)
    }

    fn service_with<P: LlmProvider + 'static>(
        insight: Option<InsightService<P>>,
    ) -> (AppService<P>, mpsc::UnboundedReceiver<AppEvent>) {
        let seed = vec![SheetData::new(
            "PABX",
            vec![Record::from_pairs([("NO", "1"), ("NAME", "A"), ("NEXT_BAT", "")])],
        )];
        let loader = SheetLoader::new(None, Arc::new(Seeded(seed)), CategoryConfig::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let sync = SheetSync::new(None).unwrap();
        (AppService::new(loader, sync, insight, tx), rx)
    }

    fn last_sheets(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Option<Vec<SheetData>> {
        let mut out = None;
        while let Ok(evt) = rx.try_recv() {
            match evt {
                AppEvent::Sheets(o) => out = Some(o.sheets),
                AppEvent::SheetsEdited(s) => out = Some(s),
                _ => {}
            }
        }
        out
    }

    #[tokio::test]
    async fn refresh_then_edit_rows() {
        let (mut svc, mut rx) = service();
        svc.refresh().await;
        assert_eq!(last_sheets(&mut rx).unwrap()[0].rows.len(), 1);

        svc.add_row("PABX", &["NAME=B".to_string()]).await;
        let sheets = last_sheets(&mut rx).unwrap();
        assert_eq!(sheets[0].rows.len(), 2);
        assert_eq!(sheets[0].rows[1].get("NO").unwrap().text(), "2");

        svc.delete_row("PABX", 1).await;
        let sheets = last_sheets(&mut rx).unwrap();
        assert_eq!(sheets[0].rows.len(), 1);
        assert_eq!(sheets[0].rows[0].get("NAME").unwrap().text(), "B");
    }

    #[tokio::test]
    async fn invalid_edits_leave_rows_untouched() {
        let (mut svc, mut rx) = service();
        svc.refresh().await;
        let _ = last_sheets(&mut rx);

        svc.add_row("PABX", &["NEXT_BAT=2026-01-01".to_string()]).await;
        svc.delete_row("PABX", 5).await;
        svc.add_row("CCTV", &["NAME=x".to_string()]).await;
        assert!(last_sheets(&mut rx).is_none());
        assert_eq!(svc.sheets[0].rows.len(), 1);
    }

    #[tokio::test]
    async fn analyze_without_provider_resets_flag() {
        let (svc, mut rx) = service();
        svc.analyze();
        let mut failed = false;
        while let Ok(evt) = rx.try_recv() {
            failed |= matches!(evt, AppEvent::AnalysisFailed);
        }
        assert!(failed);
    }

    struct Gated(Arc<Notify>);

    #[async_trait]
    impl LlmProvider for Gated {
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, LlmError> {
            self.0.notified().await;
            Ok(ChatResponse {
                text: "late answer".to_string(),
                raw: None,
            })
        }
    }

    async fn next_chat(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> (usize, bool) {
        loop {
            let evt = timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            if let AppEvent::Chat { messages, typing } = evt {
                return (messages.len(), typing);
            }
        }
    }

    #[tokio::test]
    async fn pending_answer_does_not_block_chat_clear() {
        let gate = Arc::new(Notify::new());
        let (svc, mut rx) = service_with(Some(InsightService::new(Gated(gate.clone()), "m")));

        svc.ask("how many batteries?".to_string());
        assert_eq!(next_chat(&mut rx).await, (2, true));

        // 模型尚未回答时清空对话应立即完成
        timeout(Duration::from_secs(1), svc.clear_chat())
            .await
            .unwrap();
        assert_eq!(next_chat(&mut rx).await, (1, false));

        gate.notify_one();
        assert_eq!(next_chat(&mut rx).await, (1, false));
        assert_eq!(svc.chat.lock().await.messages().len(), 1);
    }
}
