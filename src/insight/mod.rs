pub mod prompt;
pub mod service;

pub use service::{parse_analysis, AnalysisResult, ChatSession, InsightService, PendingQuestion};
