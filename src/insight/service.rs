use crate::ai::{ChatMessage, ChatRequest, LlmError, LlmProvider};
use crate::domain::record::SheetData;
use crate::insight::prompt::{
    analysis_prompt, chat_system_instruction, ANALYSIS_SYSTEM, CHAT_GREETING,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// 对话只携带最近的消息数
pub const CHAT_HISTORY_LIMIT: usize = 10;

const CHAT_FALLBACK: &str = "ขออภัยครับ ไม่พบข้อมูลที่เกี่ยวข้อง";
const CHAT_ERROR: &str = "ขออภัยครับ เกิดข้อผิดพลาดในการเชื่อมต่อกับ AI";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// 截取第一个 `{` 到最后一个 `}` 解析；失败时整段文本作为 summary
pub fn parse_analysis(text: &str) -> AnalysisResult {
    let parsed = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str::<AnalysisResult>(&text[start..=end]).ok()
        }
        _ => None,
    };
    parsed.unwrap_or_else(|| AnalysisResult {
        summary: text.to_string(),
        ..Default::default()
    })
}

fn friendly_error(e: LlmError) -> anyhow::Error {
    match e {
        LlmError::Unauthorized => anyhow::anyhow!(
            "AI 未授权：请在 .env 设置对应 LLM_PROVIDER 的 API key（GEMINI_API_KEY / OPENROUTER_API_KEY / CEREBRAS_API_KEY）"
        ),
        LlmError::RateLimited => anyhow::anyhow!("AI 请求过于频繁，请稍后再试"),
        other => anyhow::anyhow!(other.to_string()),
    }
}

pub struct InsightService<P: LlmProvider> {
    provider: P,
    model: String,
}

impl<P: LlmProvider> InsightService<P> {
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub async fn analyze(&self, sheets: &[SheetData]) -> anyhow::Result<AnalysisResult> {
        let req = ChatRequest {
            model: self.model.clone(),
            system: ANALYSIS_SYSTEM.to_string(),
            history: Vec::new(),
            user: analysis_prompt(sheets),
            temperature: 0.4,
            max_tokens: 4096,
            json_mode: true,
        };
        let resp = self.provider.chat(req).await.map_err(friendly_error)?;
        let result = parse_analysis(&resp.text);
        info!(
            "analysis done: {} insights, {} recommendations",
            result.insights.len(),
            result.recommendations.len()
        );
        Ok(result)
    }

    /// `history` 为本轮之前的全部消息，只取最后 CHAT_HISTORY_LIMIT 条
    pub async fn chat(
        &self,
        sheets: &[SheetData],
        history: &[ChatMessage],
        question: &str,
    ) -> anyhow::Result<String> {
        let start = history.len().saturating_sub(CHAT_HISTORY_LIMIT);
        let req = ChatRequest {
            model: self.model.clone(),
            system: chat_system_instruction(sheets),
            history: history[start..].to_vec(),
            user: question.to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            json_mode: false,
        };
        let resp = self.provider.chat(req).await.map_err(friendly_error)?;
        if resp.text.trim().is_empty() {
            Ok(CHAT_FALLBACK.to_string())
        } else {
            Ok(resp.text)
        }
    }
}

/// 对话记录，首条为问候语
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    /// 每次清空递增，用于丢弃清空前发出的提问的回答
    generation: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(CHAT_GREETING)],
            generation: 0,
        }
    }
}

/// 已记录但尚未得到回答的提问
#[derive(Debug, Clone)]
pub struct PendingQuestion {
    pub history: Vec<ChatMessage>,
    pub question: String,
    generation: u64,
}

impl ChatSession {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages = vec![ChatMessage::assistant(CHAT_GREETING)];
        self.generation += 1;
    }

    /// 记录用户提问并返回此前的历史；空问题返回 None
    pub fn begin(&mut self, question: &str) -> Option<PendingQuestion> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }
        let history = self.messages.clone();
        self.messages.push(ChatMessage::user(question));
        Some(PendingQuestion {
            history,
            question: question.to_string(),
            generation: self.generation,
        })
    }

    /// 调用模型；失败时返回致歉文本。不持有会话，可在锁外执行
    pub async fn reply<P: LlmProvider>(
        service: &InsightService<P>,
        sheets: &[SheetData],
        pending: &PendingQuestion,
    ) -> String {
        match service
            .chat(sheets, &pending.history, &pending.question)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("chat failed: {}", e);
                CHAT_ERROR.to_string()
            }
        }
    }

    /// 写入回答；会话在提问后被清空则丢弃并返回 false
    pub fn finish(&mut self, pending: &PendingQuestion, answer: String) -> bool {
        if pending.generation != self.generation {
            return false;
        }
        self.messages.push(ChatMessage::assistant(answer));
        true
    }

    /// 提问并记录问答；失败时记录致歉消息，不中断对话
    pub async fn ask<P: LlmProvider>(
        &mut self,
        service: &InsightService<P>,
        sheets: &[SheetData],
        question: &str,
    ) -> Result<&ChatMessage, String> {
        let pending = self
            .begin(question)
            .ok_or_else(|| "empty question".to_string())?;
        let answer = Self::reply(service, sheets, &pending).await;
        self.finish(&pending, answer);
        self.messages.last().ok_or_else(|| "no reply".to_string())
    }
}
