use crate::ai::types::{ChatRequest, ChatResponse, ChatRole, LlmError, LlmProvider};
use crate::ai::{build_llm_http_client, check_status};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Google Generative Language REST 接口（generateContent）
#[derive(Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .map_err(|_| LlmError::MissingEnv("GEMINI_API_KEY"))?;
        let base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());
        Ok(Self {
            client: build_llm_http_client()?,
            api_key,
            base_url,
        })
    }
}

pub(crate) fn request_body(req: &ChatRequest) -> Value {
    let mut contents: Vec<Value> = req
        .history
        .iter()
        .map(|m| {
            let role = match m.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
            };
            json!({"role": role, "parts": [{"text": m.text}]})
        })
        .collect();
    contents.push(json!({"role": "user", "parts": [{"text": req.user}]}));

    let mut generation = json!({
        "temperature": req.temperature,
        "maxOutputTokens": req.max_tokens,
    });
    if req.json_mode {
        generation["responseMimeType"] = json!("application/json");
    }

    let mut body = json!({
        "contents": contents,
        "generationConfig": generation,
    });
    if !req.system.is_empty() {
        body["systemInstruction"] = json!({"parts": [{"text": req.system}]});
    }
    body
}

pub(crate) fn response_text(v: &Value, raw: &str) -> Result<String, LlmError> {
    let parts = v
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| LlmError::InvalidResponse(format!("missing candidates[0], raw={raw}")))?;
    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            req.model
        );
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(&req))
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        check_status(status, &raw)?;

        let v: Value = serde_json::from_str(&raw)
            .map_err(|e| LlmError::InvalidResponse(format!("json parse failed: {e}, raw={raw}")))?;

        Ok(ChatResponse {
            text: response_text(&v, &raw)?,
            raw: Some(raw),
        })
    }
}
