use crate::ai::types::{ChatRequest, ChatResponse, LlmError, LlmProvider};
use crate::ai::{build_llm_http_client, check_status, keys_from_env, next_key, openai_messages, openai_text};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

#[derive(Clone)]
pub struct OpenRouterProvider {
    client: reqwest::Client,
    base_url: String,
    api_keys: Vec<String>,
    index: Arc<AtomicUsize>,
}

impl OpenRouterProvider {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_keys = keys_from_env("OPENROUTER_API_KEYS", "OPENROUTER_API_KEY")?;
        let base_url = std::env::var("OPENROUTER_BASE_URL")
            .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string());
        Self::new(api_keys, base_url)
    }

    pub fn new(api_keys: Vec<String>, base_url: String) -> Result<Self, LlmError> {
        if api_keys.is_empty() {
            return Err(LlmError::MissingEnv("OPENROUTER_API_KEY"));
        }
        Ok(Self {
            client: build_llm_http_client()?,
            base_url,
            api_keys,
            index: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut body = serde_json::json!({
            "model": req.model,
            "temperature": req.temperature,
            "max_tokens": req.max_tokens,
            "messages": openai_messages(&req),
        });
        if req.json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        // 超时重试一次，并换下一个 key
        let mut resp = None;
        for _ in 0..2 {
            let key = next_key(&self.api_keys, &self.index);
            match self
                .client
                .post(url.clone())
                .bearer_auth(key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => {
                    resp = Some(r);
                    break;
                }
                Err(e) if e.is_timeout() => continue,
                Err(e) => return Err(e.into()),
            }
        }
        let resp = resp.ok_or_else(|| LlmError::Http("timeout".to_string()))?;

        let status = resp.status();
        let raw = resp.text().await?;
        check_status(status, &raw)?;

        let v: Value = serde_json::from_str(&raw)
            .map_err(|e| LlmError::InvalidResponse(format!("json parse failed: {e}, raw={raw}")))?;
        let text = openai_text(&v, &raw)?;

        Ok(ChatResponse {
            text,
            raw: Some(raw),
        })
    }
}
