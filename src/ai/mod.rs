pub mod cerebras;
pub mod gemini;
pub mod openrouter;
pub mod types;
pub mod unified;

pub use cerebras::CerebrasProvider;
pub use gemini::GeminiProvider;
pub use openrouter::OpenRouterProvider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, ChatRole, LlmError, LlmProvider};
pub use unified::AnyProvider;

use reqwest::StatusCode;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const LLM_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_llm_http_client() -> Result<reqwest::Client, LlmError> {
    Ok(crate::http::build_http_client(LLM_TIMEOUT)?)
}

/// `*_API_KEYS` 支持逗号、分号、空白分隔的多个 key
pub(crate) fn split_keys(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

pub(crate) fn keys_from_env(
    multi: &str,
    single: &'static str,
) -> Result<Vec<String>, LlmError> {
    let keys = std::env::var(multi)
        .map(|s| split_keys(&s))
        .unwrap_or_default();
    if !keys.is_empty() {
        return Ok(keys);
    }
    let key = std::env::var(single).map_err(|_| LlmError::MissingEnv(single))?;
    Ok(vec![key])
}

/// 轮询选取 key
pub(crate) fn next_key<'a>(keys: &'a [String], index: &AtomicUsize) -> &'a str {
    let i = index.fetch_add(1, Ordering::Relaxed);
    &keys[i % keys.len()]
}

pub(crate) fn check_status(status: StatusCode, raw: &str) -> Result<(), LlmError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(LlmError::Unauthorized),
        StatusCode::TOO_MANY_REQUESTS => Err(LlmError::RateLimited),
        s if !s.is_success() => Err(LlmError::Http(format!("{} {}", s.as_u16(), raw))),
        _ => Ok(()),
    }
}

/// OpenAI 兼容接口的 messages：system + 历史 + 本轮提问
pub(crate) fn openai_messages(req: &ChatRequest) -> Vec<Value> {
    let mut messages = Vec::with_capacity(req.history.len() + 2);
    messages.push(serde_json::json!({"role": "system", "content": req.system}));
    for m in &req.history {
        let role = match m.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        messages.push(serde_json::json!({"role": role, "content": m.text}));
    }
    messages.push(serde_json::json!({"role": "user", "content": req.user}));
    messages
}

/// 兼容多种返回结构：message.content（字符串或数组）、content、text，以及顶层 output_text
pub(crate) fn openai_text(v: &Value, raw: &str) -> Result<String, LlmError> {
    let choice0 = v
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| LlmError::InvalidResponse(format!("missing choices[0], raw={raw}")))?;

    let content = choice0
        .get("message")
        .and_then(|m| m.get("content"))
        .or_else(|| choice0.get("content"));

    match content {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Array(arr)) => Ok(arr
            .iter()
            .filter_map(|it| it.get("text").and_then(|x| x.as_str()).or_else(|| it.as_str()))
            .collect::<Vec<_>>()
            .join("\n")),
        Some(_) => Err(LlmError::InvalidResponse(format!(
            "unexpected content type, raw={raw}"
        ))),
        None => match (choice0.get("text"), v.get("output_text")) {
            (Some(Value::String(s)), _) | (None, Some(Value::String(s))) => Ok(s.clone()),
            _ => Err(LlmError::InvalidResponse(format!(
                "missing content/text in choices[0], raw={raw}"
            ))),
        },
    }
}
