use crate::ai::types::{ChatRequest, ChatResponse, LlmError, LlmProvider};
use crate::ai::{build_llm_http_client, check_status, keys_from_env, next_key, openai_messages, openai_text};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "llama-3.3-70b";

#[derive(Clone)]
pub struct CerebrasProvider {
    client: reqwest::Client,
    base_url: String,
    api_keys: Vec<String>,
    index: Arc<AtomicUsize>,
}

impl CerebrasProvider {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_keys = keys_from_env("CEREBRAS_API_KEYS", "CEREBRAS_API_KEY")?;
        let base_url = std::env::var("CEREBRAS_BASE_URL")
            .unwrap_or_else(|_| "https://api.cerebras.ai/v1".to_string());
        Ok(Self {
            client: build_llm_http_client()?,
            base_url,
            api_keys,
            index: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl LlmProvider for CerebrasProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut body = serde_json::json!({
            "model": req.model,
            "temperature": req.temperature,
            "max_completion_tokens": req.max_tokens,
            "messages": openai_messages(&req),
            "stream": false
        });
        if req.json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        let key = next_key(&self.api_keys, &self.index);
        let resp = self
            .client
            .post(url)
            .bearer_auth(key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        check_status(status, &raw)?;

        let v: Value = serde_json::from_str(&raw)
            .map_err(|e| LlmError::InvalidResponse(format!("json parse failed: {e}, raw={raw}")))?;

        Ok(ChatResponse {
            text: openai_text(&v, &raw)?,
            raw: Some(raw),
        })
    }
}
