use crate::ai::types::{ChatRequest, ChatResponse, LlmError, LlmProvider};
use crate::ai::{cerebras, gemini, openrouter};
use crate::ai::{CerebrasProvider, GeminiProvider, OpenRouterProvider};
use async_trait::async_trait;

#[derive(Clone)]
pub enum InnerProvider {
    OpenRouter(OpenRouterProvider),
    Cerebras(CerebrasProvider),
    Gemini(GeminiProvider),
}

/// 由 `LLM_PROVIDER` 选择的供应商（默认 gemini）
#[derive(Clone)]
pub struct AnyProvider {
    inner: InnerProvider,
}

impl AnyProvider {
    pub fn from_env() -> Result<Self, LlmError> {
        let which = std::env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "gemini".to_string())
            .to_lowercase();
        let inner = match which.as_str() {
            "cerebras" => InnerProvider::Cerebras(CerebrasProvider::from_env()?),
            "openrouter" => InnerProvider::OpenRouter(OpenRouterProvider::from_env()?),
            _ => InnerProvider::Gemini(GeminiProvider::from_env()?),
        };
        Ok(Self { inner })
    }

    pub fn name(&self) -> &'static str {
        match &self.inner {
            InnerProvider::OpenRouter(_) => "openrouter",
            InnerProvider::Cerebras(_) => "cerebras",
            InnerProvider::Gemini(_) => "gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match &self.inner {
            InnerProvider::OpenRouter(_) => openrouter::DEFAULT_MODEL,
            InnerProvider::Cerebras(_) => cerebras::DEFAULT_MODEL,
            InnerProvider::Gemini(_) => gemini::DEFAULT_MODEL,
        }
    }
}

#[async_trait]
impl LlmProvider for AnyProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError> {
        match &self.inner {
            InnerProvider::OpenRouter(p) => p.chat(req).await,
            InnerProvider::Cerebras(p) => p.chat(req).await,
            InnerProvider::Gemini(p) => p.chat(req).await,
        }
    }
}
